//! Data models for the sales dashboard.
//!
//! This module contains the per-product aggregate built from the
//! spreadsheet tables and the plain records the query layer hands
//! to the renderers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Synthetic option appended to every year and platform list.
pub const ALL: &str = "All";

/// Sale type for printed/physical units.
pub const PHYSICAL: &str = "Physical";

/// Sale type for ebooks on regular products.
pub const EBOOK: &str = "eBook";

/// Sale type for digital units on the magnet product.
pub const DIGITAL: &str = "Digital";

/// Product label that switches the ebook category to "Digital".
pub const MAGNET_LABEL: &str = "Magnet";

/// Display labels for months 1 through 12.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "March", "April", "May", "June", "July", "Aug", "Sept", "Oct", "Nov", "Dec",
];

/// Free-text insights keyed by product name.
pub type InsightTable = BTreeMap<String, Vec<String>>;

type MonthMap = BTreeMap<String, u64>;
type YearMap = BTreeMap<String, MonthMap>;
type TypeMap = BTreeMap<String, YearMap>;

/// Which dashboard view is active.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Totals per year (default)
    #[default]
    Yearly,
    /// Month-by-month series for one year
    Monthly,
    /// Totals per platform with proportion shares
    Platform,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Yearly => write!(f, "yearly"),
            View::Monthly => write!(f, "monthly"),
            View::Platform => write!(f, "platform"),
        }
    }
}

/// Per-product configuration, partly from the config table and partly
/// discovered while reading sales rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Years seen in sales data, sorted, followed by "All".
    pub years: Vec<String>,
    /// Platforms in discovery order, followed by "All".
    pub platforms: Vec<String>,
    /// Whether the ebook/digital category is tracked.
    pub has_ebooks: bool,
    /// Forecast multiplier. `None` when the cell did not parse.
    pub growth_factor: Option<f64>,
    /// Display name; "Magnet" also renames the ebook category.
    pub product_label: String,
}

impl ProductConfig {
    /// Creates a config with empty year and platform lists.
    pub fn new(has_ebooks: bool, growth_factor: Option<f64>, product_label: String) -> Self {
        Self {
            years: Vec::new(),
            platforms: Vec::new(),
            has_ebooks,
            growth_factor,
            product_label,
        }
    }

    /// Years excluding the synthetic "All".
    pub fn real_years(&self) -> impl Iterator<Item = &str> {
        self.years.iter().map(String::as_str).filter(|y| *y != ALL)
    }

    /// Platforms excluding the synthetic "All".
    pub fn real_platforms(&self) -> impl Iterator<Item = &str> {
        self.platforms.iter().map(String::as_str).filter(|p| *p != ALL)
    }

    pub fn has_year(&self, year: &str) -> bool {
        self.years.iter().any(|y| y == year)
    }

    pub fn has_platform(&self, platform: &str) -> bool {
        self.platforms.iter().any(|p| p == platform)
    }

    /// Sale type key used for the ebook/digital category.
    pub fn ebook_type(&self) -> &'static str {
        if self.product_label == MAGNET_LABEL {
            DIGITAL
        } else {
            EBOOK
        }
    }

    /// Column header for physical units.
    pub fn physical_header(&self) -> String {
        format!("Physical {}", self.product_label)
    }

    /// Column header for the ebook/digital category.
    pub fn ebook_header(&self) -> &'static str {
        if self.product_label == MAGNET_LABEL {
            "Digital Products"
        } else {
            "eBooks"
        }
    }
}

/// Unit counts keyed platform → sale type → year → month.
///
/// A missing key at any level reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesAggregate {
    platforms: BTreeMap<String, TypeMap>,
}

impl SalesAggregate {
    /// Sets the count for a key, creating intermediate levels as needed.
    /// A later write to the same key replaces the earlier one.
    pub fn upsert(&mut self, platform: &str, sale_type: &str, year: &str, month: &str, units: u64) {
        self.platforms
            .entry(platform.to_string())
            .or_default()
            .entry(sale_type.to_string())
            .or_default()
            .entry(year.to_string())
            .or_default()
            .insert(month.to_string(), units);
    }

    /// Returns the count for a key, or zero when any level is absent.
    pub fn get(&self, platform: &str, sale_type: &str, year: &str, month: &str) -> u64 {
        self.platforms
            .get(platform)
            .and_then(|types| types.get(sale_type))
            .and_then(|years| years.get(year))
            .and_then(|months| months.get(month))
            .copied()
            .unwrap_or(0)
    }

    /// Number of populated leaves.
    pub fn len(&self) -> usize {
        self.platforms
            .values()
            .flat_map(|types| types.values())
            .flat_map(|years| years.values())
            .map(|months| months.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Display conditions of a note. Each list is either empty/blank
/// (matches anything) or the literal values that must contain the
/// candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteConditions {
    pub years: Vec<String>,
    pub platforms: Vec<String>,
    pub months: Vec<String>,
}

impl NoteConditions {
    /// Whether the month list restricts anything.
    pub fn has_month_condition(&self) -> bool {
        self.months.first().is_some_and(|m| !m.is_empty())
    }
}

/// An annotation attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub text: String,
    pub conditions: NoteConditions,
}

/// A product with its configuration, sales and annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub config: ProductConfig,
    pub sales: SalesAggregate,
    pub notes: Vec<Note>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<Vec<String>>,
}

impl Product {
    /// Creates a product with no sales, notes or insights.
    pub fn new(config: ProductConfig) -> Self {
        Self {
            config,
            sales: SalesAggregate::default(),
            notes: Vec::new(),
            insights: None,
        }
    }
}

/// All products of one data load, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCatalog {
    products: BTreeMap<String, Product>,
}

impl ProductCatalog {
    pub fn get(&self, name: &str) -> Option<&Product> {
        self.products.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Product> {
        self.products.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.products.contains_key(name)
    }

    /// Inserts a product unless the name is already taken.
    /// Returns whether the product was inserted.
    pub fn insert_if_absent(&mut self, name: &str, product: Product) -> bool {
        if self.products.contains_key(name) {
            return false;
        }
        self.products.insert(name.to_string(), product);
        true
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.products.keys().map(String::as_str)
    }

    /// Products with their names, in name order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Product)> {
        self.products
            .iter_mut()
            .map(|(name, product)| (name.as_str(), product))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Physical, ebook and combined unit counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesTotals {
    pub physical: u64,
    pub ebook: u64,
    pub total: u64,
}

impl SalesTotals {
    pub fn new(physical: u64, ebook: u64) -> Self {
        Self {
            physical,
            ebook,
            total: physical.saturating_add(ebook),
        }
    }
}

/// Totals for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyTotal {
    pub year: String,
    #[serde(flatten)]
    pub totals: SalesTotals,
}

/// Totals for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformTotal {
    pub platform: String,
    #[serde(flatten)]
    pub totals: SalesTotals,
}

/// Totals for one calendar month of the selected year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// Month number, 1-12.
    pub month: u8,
    pub label: String,
    #[serde(flatten)]
    pub totals: SalesTotals,
    /// Ids of month-specific notes that match this point.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note_ids: Vec<i64>,
}

/// Actual sales for the forecast year, compared against the forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastActual {
    #[serde(flatten)]
    pub totals: SalesTotals,
    pub completion_percent: u64,
}

/// Projected totals for the forecast year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub label: String,
    pub base_year: String,
    pub target_year: String,
    pub growth_factor: f64,
    #[serde(flatten)]
    pub totals: SalesTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<ForecastActual>,
}

/// Series for a proportion chart, one entry per platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieShares {
    pub labels: Vec<String>,
    pub physical: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebook: Option<Vec<u64>>,
}

impl PieShares {
    /// Sum of every value in every series.
    pub fn grand_total(&self) -> u64 {
        self.physical
            .iter()
            .chain(self.ebook.iter().flatten())
            .fold(0u64, |sum, value| sum.saturating_add(*value))
    }
}

/// One row of the summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub label: String,
    #[serde(flatten)]
    pub totals: SalesTotals,
    pub is_forecast: bool,
}

/// Column labels that depend on the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLabels {
    pub physical: String,
    pub ebook: String,
}

/// Which selectors are meaningful in the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub year_enabled: bool,
    pub platform_enabled: bool,
}

/// Everything the presentation layer needs for one selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub product: String,
    pub view: View,
    pub year: String,
    pub platform: String,
    pub products: Vec<String>,
    pub years: Vec<String>,
    pub platforms: Vec<String>,
    pub has_ebooks: bool,
    pub labels: ColumnLabels,
    pub controls: Controls,
    pub yearly: Vec<YearlyTotal>,
    pub platform_totals: Vec<PlatformTotal>,
    pub monthly: Vec<MonthlyPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Forecast>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_explanation: Option<String>,
    pub pie: PieShares,
    pub summary: Vec<SummaryRow>,
    pub notes: Vec<Note>,
    pub insights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_missing_key_reads_zero() {
        let mut sales = SalesAggregate::default();
        sales.upsert("AmazonUS", PHYSICAL, "2024", "1", 100);

        assert_eq!(sales.get("AmazonUS", PHYSICAL, "2024", "1"), 100);
        assert_eq!(sales.get("AmazonUS", PHYSICAL, "2024", "2"), 0);
        assert_eq!(sales.get("AmazonUS", EBOOK, "2024", "1"), 0);
        assert_eq!(sales.get("Etsy", PHYSICAL, "2024", "1"), 0);
    }

    #[test]
    fn test_aggregate_last_write_wins() {
        let mut sales = SalesAggregate::default();
        sales.upsert("AmazonUS", PHYSICAL, "2024", "1", 100);
        sales.upsert("AmazonUS", PHYSICAL, "2024", "1", 40);

        assert_eq!(sales.get("AmazonUS", PHYSICAL, "2024", "1"), 40);
        assert_eq!(sales.len(), 1);
    }

    #[test]
    fn test_ebook_type_follows_label() {
        let book = ProductConfig::new(true, Some(1.1), "Cookbook".to_string());
        let magnet = ProductConfig::new(true, Some(1.1), MAGNET_LABEL.to_string());

        assert_eq!(book.ebook_type(), EBOOK);
        assert_eq!(book.ebook_header(), "eBooks");
        assert_eq!(magnet.ebook_type(), DIGITAL);
        assert_eq!(magnet.ebook_header(), "Digital Products");
        assert_eq!(magnet.physical_header(), "Physical Magnet");
    }

    #[test]
    fn test_real_lists_skip_all() {
        let mut config = ProductConfig::new(false, None, "Liner".to_string());
        config.years = vec!["2023".into(), "2024".into(), ALL.into()];
        config.platforms = vec!["Etsy".into(), ALL.into()];

        assert_eq!(config.real_years().collect::<Vec<_>>(), vec!["2023", "2024"]);
        assert_eq!(config.real_platforms().collect::<Vec<_>>(), vec!["Etsy"]);
        assert!(config.has_year(ALL));
    }

    #[test]
    fn test_catalog_first_insert_wins() {
        let mut catalog = ProductCatalog::default();
        let first = Product::new(ProductConfig::new(true, Some(1.2), "First".to_string()));
        let second = Product::new(ProductConfig::new(false, None, "Second".to_string()));

        assert!(catalog.insert_if_absent("Widget", first));
        assert!(!catalog.insert_if_absent("Widget", second));
        assert_eq!(catalog.get("Widget").unwrap().config.product_label, "First");
    }

    #[test]
    fn test_pie_grand_total() {
        let pie = PieShares {
            labels: vec!["A".into(), "B".into()],
            physical: vec![10, 20],
            ebook: Some(vec![5, 0]),
        };
        assert_eq!(pie.grand_total(), 35);
    }

    #[test]
    fn test_month_condition_flag() {
        let mut conditions = NoteConditions::default();
        assert!(!conditions.has_month_condition());

        conditions.months = vec![String::new()];
        assert!(!conditions.has_month_condition());

        conditions.months = vec!["12".to_string()];
        assert!(conditions.has_month_condition());
    }
}
