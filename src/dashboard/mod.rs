//! Dashboard state.
//!
//! Owns the current catalog and the user's selection. A rebuild either
//! replaces the catalog wholesale or leaves it untouched; selection
//! changes only touch the selection. `recompute` produces every view
//! for the current selection in one call.

pub mod refresh;

pub use refresh::{rebuild, RefreshGate};

use crate::analysis::notes::conditions_match;
use crate::analysis::{matching_notes, query, QueryContext};
use crate::config::DashboardConfig;
use crate::ingest::IngestError;
use crate::models::{
    ColumnLabels, Controls, DashboardView, ProductCatalog, View, ALL,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shown when the first load fails.
pub const LOAD_ERROR_BANNER: &str =
    "Error loading data. Please check your connection and try again.";

/// Shown when a refresh fails and older data stays on screen.
pub const REFRESH_ERROR_BANNER: &str = "Error refreshing data. Using last loaded data.";

/// What the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub product: String,
    pub view: View,
    pub year: String,
    pub platform: String,
}

impl Selection {
    /// A selection of the given product with both filters on "All".
    pub fn new(product: impl Into<String>, view: View) -> Self {
        Self {
            product: product.into(),
            view,
            year: ALL.to_string(),
            platform: ALL.to_string(),
        }
    }
}

/// Selection used on startup. The product is also the fallback when the
/// selected one goes away.
#[derive(Debug, Clone)]
pub struct DashboardDefaults {
    pub product: String,
    pub view: View,
}

impl From<&DashboardConfig> for DashboardDefaults {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            product: config.default_product.clone(),
            view: config.default_view,
        }
    }
}

pub struct Dashboard {
    catalog: Arc<ProductCatalog>,
    selection: Selection,
    defaults: DashboardDefaults,
    loaded: bool,
    banner: Option<String>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl Dashboard {
    /// An empty dashboard waiting for its first load.
    pub fn new(defaults: DashboardDefaults) -> Self {
        Self {
            catalog: Arc::new(ProductCatalog::default()),
            selection: Selection::new(defaults.product.clone(), defaults.view),
            defaults,
            loaded: false,
            banner: None,
            refreshed_at: None,
        }
    }

    /// The catalog currently on display.
    pub fn catalog(&self) -> Arc<ProductCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Whether any load has succeeded.
    pub fn has_data(&self) -> bool {
        self.loaded
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Swap in a rebuilt catalog, or record the failure and keep the
    /// previous one. Returns whether the catalog was replaced.
    pub fn apply_rebuild(&mut self, result: Result<ProductCatalog, IngestError>) -> bool {
        match result {
            Ok(catalog) => {
                info!("Loaded {} products", catalog.len());
                self.catalog = Arc::new(catalog);
                self.loaded = true;
                self.banner = None;
                self.refreshed_at = Some(Utc::now());
                self.reconcile_selection();
                true
            }
            Err(e) => {
                let banner = if self.loaded {
                    REFRESH_ERROR_BANNER
                } else {
                    LOAD_ERROR_BANNER
                };
                error!(table = %e.table(), "{} ({})", banner, e);
                self.banner = Some(banner.to_string());
                false
            }
        }
    }

    /// The configured default product if present, else the first one.
    fn default_product(&self) -> String {
        if self.catalog.contains(&self.defaults.product) {
            return self.defaults.product.clone();
        }
        self.catalog
            .names()
            .next()
            .map(String::from)
            .unwrap_or_else(|| self.defaults.product.clone())
    }

    /// Keep whatever part of the selection still exists after a rebuild.
    fn reconcile_selection(&mut self) {
        let Some(product) = self.catalog.get(&self.selection.product) else {
            let fallback = self.default_product();
            debug!(
                "Selected product {} is gone, switching to {}",
                self.selection.product, fallback
            );
            self.selection = Selection::new(fallback, View::Yearly);
            return;
        };

        if !product.config.has_year(&self.selection.year) {
            self.selection.year = ALL.to_string();
        }
        if !product.config.has_platform(&self.selection.platform) {
            self.selection.platform = ALL.to_string();
        }
    }

    /// Switch product and reset the other selectors to the yearly view
    /// with both filters on "All". Unknown products are ignored.
    pub fn select_product(&mut self, name: &str) -> bool {
        if !self.catalog.contains(name) {
            warn!("Unknown product: {}", name);
            return false;
        }
        self.selection = Selection::new(name, View::Yearly);
        true
    }

    /// Change view. Entering the monthly view with no year selected
    /// jumps to the most recent year.
    pub fn set_view(&mut self, view: View) {
        self.selection.view = view;

        if view == View::Monthly && self.selection.year == ALL {
            if let Some(product) = self.catalog.get(&self.selection.product) {
                if let Some(latest) = query::latest_year(&product.config.years) {
                    debug!("Advancing year to {}", latest);
                    self.selection.year = latest.to_string();
                }
            }
        }
    }

    /// Change the year filter; years the product does not have fall back to "All".
    pub fn set_year(&mut self, year: &str) {
        let known = self
            .catalog
            .get(&self.selection.product)
            .is_some_and(|p| p.config.has_year(year));

        self.selection.year = if known {
            year.to_string()
        } else {
            debug!("Year {} not available, using {}", year, ALL);
            ALL.to_string()
        };
    }

    /// Change the platform filter; unknown platforms fall back to "All".
    pub fn set_platform(&mut self, platform: &str) {
        let known = self
            .catalog
            .get(&self.selection.product)
            .is_some_and(|p| p.config.has_platform(platform));

        self.selection.platform = if known {
            platform.to_string()
        } else {
            debug!("Platform {} not available, using {}", platform, ALL);
            ALL.to_string()
        };
    }

    /// Compute every view for the current selection.
    ///
    /// Returns `None` when the selected product is not in the catalog
    /// (including before the first successful load).
    pub fn recompute(&self) -> Option<DashboardView> {
        let selection = &self.selection;
        let Some(product) = self.catalog.get(&selection.product) else {
            debug!("No data found for product: {}", selection.product);
            return None;
        };

        let config = &product.config;
        let ctx = QueryContext::new(&selection.year, &selection.platform);

        let yearly = query::yearly_totals(product, &ctx);
        let platform_totals = query::platform_totals(product, &ctx);
        let pie = query::pie_shares(product, &ctx);

        let mut monthly = query::monthly_series(product, &ctx);
        for point in &mut monthly {
            let month = point.month.to_string();
            point.note_ids = product
                .notes
                .iter()
                .filter(|note| note.conditions.has_month_condition())
                .filter(|note| conditions_match(&note.conditions, ctx.year, ctx.platform, Some(&month)))
                .map(|note| note.id)
                .collect();
        }

        let forecast = query::forecast(product, &ctx).filter(|_| query::forecast_visible(ctx.year));
        let forecast_explanation = forecast.as_ref().map(query::forecast_explanation);
        let summary = query::summary_rows(&yearly, forecast.as_ref());

        let notes = matching_notes(&product.notes, ctx.year, ctx.platform, None)
            .into_iter()
            .cloned()
            .collect();

        Some(DashboardView {
            product: selection.product.clone(),
            view: selection.view,
            year: selection.year.clone(),
            platform: selection.platform.clone(),
            products: self.catalog.names().map(String::from).collect(),
            years: config.years.clone(),
            platforms: config.platforms.clone(),
            has_ebooks: config.has_ebooks,
            labels: ColumnLabels {
                physical: config.physical_header(),
                ebook: config.ebook_header().to_string(),
            },
            controls: Controls {
                year_enabled: selection.view != View::Yearly,
                platform_enabled: selection.view != View::Platform,
            },
            yearly,
            platform_totals,
            monthly,
            forecast,
            forecast_explanation,
            pie,
            summary,
            notes,
            insights: product.insights.clone().unwrap_or_default(),
            refreshed_at: self.refreshed_at,
            banner: self.banner.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::build_catalog;
    use crate::analysis::test_support::{sample_catalog, tables};
    use crate::ingest::TableKind;
    use crate::models::InsightTable;

    fn defaults(product: &str) -> DashboardDefaults {
        DashboardDefaults {
            product: product.to_string(),
            view: View::Yearly,
        }
    }

    fn loaded(product: &str) -> Dashboard {
        let mut dashboard = Dashboard::new(defaults(product));
        assert!(dashboard.apply_rebuild(Ok(sample_catalog())));
        dashboard
    }

    fn transport_error() -> IngestError {
        IngestError::Status {
            table: TableKind::Sales,
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    #[test]
    fn test_nothing_to_show_before_load() {
        let dashboard = Dashboard::new(defaults("Widget"));
        assert!(!dashboard.has_data());
        assert!(dashboard.recompute().is_none());
    }

    #[test]
    fn test_failed_initial_load() {
        let mut dashboard = Dashboard::new(defaults("Widget"));

        assert!(!dashboard.apply_rebuild(Err(transport_error())));
        assert!(!dashboard.has_data());
        assert_eq!(dashboard.banner(), Some(LOAD_ERROR_BANNER));
        assert!(dashboard.catalog().is_empty());
    }

    #[test]
    fn test_failed_refresh_keeps_previous_data() {
        let mut dashboard = loaded("Widget");
        let before = dashboard.catalog();

        assert!(!dashboard.apply_rebuild(Err(transport_error())));
        assert_eq!(dashboard.banner(), Some(REFRESH_ERROR_BANNER));
        assert!(Arc::ptr_eq(&before, &dashboard.catalog()));

        let view = dashboard.recompute().unwrap();
        assert_eq!(view.banner.as_deref(), Some(REFRESH_ERROR_BANNER));
        assert_eq!(view.yearly.len(), 3);
    }

    #[test]
    fn test_successful_refresh_clears_banner() {
        let mut dashboard = loaded("Widget");
        dashboard.apply_rebuild(Err(transport_error()));
        dashboard.apply_rebuild(Ok(sample_catalog()));
        assert!(dashboard.banner().is_none());
    }

    #[test]
    fn test_rebuild_swaps_without_touching_old_catalog() {
        let mut dashboard = loaded("Widget");
        let before = dashboard.catalog();

        dashboard.apply_rebuild(Ok(ProductCatalog::default()));

        assert_eq!(before.len(), 4);
        assert!(dashboard.catalog().is_empty());
    }

    #[test]
    fn test_missing_default_product_falls_back_to_first() {
        let dashboard = loaded("Cookbook");
        assert_eq!(dashboard.selection().product, "Broken");
    }

    #[test]
    fn test_refresh_keeps_valid_selection() {
        let mut dashboard = loaded("Widget");
        dashboard.set_view(View::Platform);
        dashboard.set_year("2024");
        dashboard.set_platform("Etsy");

        dashboard.apply_rebuild(Ok(sample_catalog()));

        let selection = dashboard.selection();
        assert_eq!(selection.view, View::Platform);
        assert_eq!(selection.year, "2024");
        assert_eq!(selection.platform, "Etsy");
    }

    #[test]
    fn test_refresh_resets_vanished_year_and_platform() {
        let mut dashboard = loaded("Widget");
        dashboard.set_view(View::Monthly);
        dashboard.set_year("2023");
        dashboard.set_platform("Etsy");

        let smaller = build_catalog(
            &tables(
                &[&["Widget", "TRUE", "1.2", "Widget"]],
                &[&["Widget", "AmazonUS", "Physical", "2024", "1", "5"]],
                &[],
            ),
            &InsightTable::new(),
        );
        dashboard.apply_rebuild(Ok(smaller));

        let selection = dashboard.selection();
        assert_eq!(selection.product, "Widget");
        assert_eq!(selection.view, View::Monthly);
        assert_eq!(selection.year, ALL);
        assert_eq!(selection.platform, ALL);
    }

    #[test]
    fn test_refresh_resets_vanished_product() {
        let mut dashboard = loaded("Liner");
        dashboard.select_product("Widget");
        dashboard.set_view(View::Platform);
        dashboard.set_platform("Etsy");

        let without_widget = build_catalog(
            &tables(&[&["Liner", "FALSE", "1.1", "Liner"]], &[], &[]),
            &InsightTable::new(),
        );
        dashboard.apply_rebuild(Ok(without_widget));

        assert_eq!(dashboard.selection(), &Selection::new("Liner", View::Yearly));
    }

    #[test]
    fn test_product_change_returns_to_yearly_view() {
        let mut dashboard = Dashboard::new(DashboardDefaults {
            product: "Widget".to_string(),
            view: View::Monthly,
        });
        dashboard.apply_rebuild(Ok(sample_catalog()));
        assert_eq!(dashboard.selection().view, View::Monthly);

        assert!(dashboard.select_product("Magnet"));
        assert_eq!(dashboard.selection(), &Selection::new("Magnet", View::Yearly));

        dashboard.apply_rebuild(Ok(build_catalog(
            &tables(&[&["Liner", "FALSE", "1.1", "Liner"]], &[], &[]),
            &InsightTable::new(),
        )));
        assert_eq!(dashboard.selection(), &Selection::new("Liner", View::Yearly));
    }

    #[test]
    fn test_select_product_resets_filters() {
        let mut dashboard = loaded("Widget");
        dashboard.set_view(View::Monthly);
        dashboard.set_platform("Etsy");

        assert!(dashboard.select_product("Magnet"));
        assert_eq!(dashboard.selection(), &Selection::new("Magnet", View::Yearly));

        assert!(!dashboard.select_product("Nope"));
        assert_eq!(dashboard.selection().product, "Magnet");
    }

    #[test]
    fn test_monthly_view_advances_to_latest_year() {
        let mut dashboard = loaded("Widget");
        dashboard.set_view(View::Monthly);
        assert_eq!(dashboard.selection().year, "2025");

        dashboard.set_year("2023");
        dashboard.set_view(View::Yearly);
        dashboard.set_view(View::Monthly);
        assert_eq!(dashboard.selection().year, "2023");
    }

    #[test]
    fn test_unknown_filters_fall_back_to_all() {
        let mut dashboard = loaded("Widget");
        dashboard.set_year("1999");
        dashboard.set_platform("Walmart");

        assert_eq!(dashboard.selection().year, ALL);
        assert_eq!(dashboard.selection().platform, ALL);
    }

    #[test]
    fn test_recompute_default_selection() {
        let dashboard = loaded("Widget");
        let view = dashboard.recompute().unwrap();

        assert_eq!(view.product, "Widget");
        assert_eq!(view.products, vec!["Broken", "Liner", "Magnet", "Widget"]);
        assert_eq!(view.labels.physical, "Physical Widget");
        assert_eq!(view.labels.ebook, "eBooks");
        assert!(!view.controls.year_enabled);
        assert!(view.controls.platform_enabled);
        assert!(view.monthly.is_empty());
        assert!(view.forecast.is_some());
        assert!(view.forecast_explanation.is_some());
        assert_eq!(view.summary.len(), 4);
        assert!(view.refreshed_at.is_some());

        let note_ids: Vec<i64> = view.notes.iter().map(|n| n.id).collect();
        assert_eq!(note_ids, vec![1]);
    }

    #[test]
    fn test_recompute_hides_forecast_for_other_years() {
        let mut dashboard = loaded("Widget");
        dashboard.set_view(View::Platform);

        dashboard.set_year("2024");
        let view = dashboard.recompute().unwrap();
        assert!(view.forecast.is_none());
        assert_eq!(view.summary.len(), 3);

        dashboard.set_year("2025");
        assert!(dashboard.recompute().unwrap().forecast.is_some());
    }

    #[test]
    fn test_recompute_monthly_note_markers() {
        let mut dashboard = loaded("Widget");
        dashboard.set_view(View::Monthly);
        dashboard.set_year("2024");

        let view = dashboard.recompute().unwrap();
        assert_eq!(view.monthly.len(), 12);
        assert_eq!(view.monthly[1].note_ids, vec![3]);
        assert_eq!(view.monthly[11].note_ids, vec![1]);
        assert!(view.monthly[0].note_ids.is_empty());
        assert!(view.controls.year_enabled);

        dashboard.set_platform("Etsy");
        let etsy = dashboard.recompute().unwrap();
        let note_ids: Vec<i64> = etsy.notes.iter().map(|n| n.id).collect();
        assert_eq!(note_ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_recompute_attaches_insights() {
        let mut insights = InsightTable::new();
        insights.insert("Widget".to_string(), vec!["Top seller".to_string()]);

        let mut dashboard = Dashboard::new(defaults("Widget"));
        dashboard.apply_rebuild(Ok(build_catalog(
            &crate::analysis::test_support::sample_tables(),
            &insights,
        )));

        assert_eq!(dashboard.recompute().unwrap().insights, vec!["Top seller"]);
    }
}
