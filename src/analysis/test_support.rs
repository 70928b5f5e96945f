//! Shared fixtures for analysis and dashboard tests.

use super::build_catalog;
use crate::ingest::{RawTables, RowTable};
use crate::models::{InsightTable, ProductCatalog};

const CONFIG_HEADER: &[&str] = &["Product", "HasEbooks", "GrowthFactor", "ProductLabel"];
const SALES_HEADER: &[&str] = &["Product", "Platform", "Type", "Year", "Month", "Sales"];
const NOTES_HEADER: &[&str] = &[
    "Product",
    "ID",
    "Note",
    "YearCondition",
    "PlatformCondition",
    "MonthCondition",
];

fn with_header(header: &[&str], rows: &[&[&str]]) -> RowTable {
    let mut all: Vec<&[&str]> = vec![header];
    all.extend_from_slice(rows);
    RowTable::from_strs(&all)
}

/// Tables with the standard headers prepended.
pub fn tables(config: &[&[&str]], sales: &[&[&str]], notes: &[&[&str]]) -> RawTables {
    RawTables {
        config: with_header(CONFIG_HEADER, config),
        sales: with_header(SALES_HEADER, sales),
        notes: with_header(NOTES_HEADER, notes),
    }
}

/// Four products covering ebooks, the digital label, no ebooks and a
/// broken growth factor.
///
/// Widget (growth 1.2), platforms AmazonUS then Etsy:
///
/// | year | AmazonUS phys/ebook | Etsy phys |
/// |------|---------------------|-----------|
/// | 2023 | 80 / 0              | 0         |
/// | 2024 | 150 / 10            | 40        |
/// | 2025 | 120 / 6             | 60        |
pub fn sample_tables() -> RawTables {
    tables(
        &[
            &["Widget", "TRUE", "1.2", "Widget"],
            &["Magnet", "TRUE", "1.5", "Magnet"],
            &["Liner", "FALSE", "1.1", "Liner"],
            &["Broken", "TRUE", "n/a", "Broken"],
        ],
        &[
            &["Widget", "AmazonUS", "Physical", "2024", "1", "100"],
            &["Widget", "AmazonUS", "Physical", "2024", "2", "50"],
            &["Widget", "AmazonUS", "eBook", "2024", "1", "10"],
            &["Widget", "Etsy", "Physical", "2024", "3", "40"],
            &["Widget", "Etsy", "Physical", "2025", "1", "60"],
            &["Widget", "AmazonUS", "Physical", "2025", "2", "120"],
            &["Widget", "AmazonUS", "eBook", "2025", "2", "6"],
            &["Widget", "AmazonUS", "Physical", "2023", "12", "80"],
            &["Magnet", "Shopify", "Physical", "2024", "1", "20"],
            &["Magnet", "Shopify", "Digital", "2024", "1", "30"],
            &["Magnet", "Shopify", "eBook", "2024", "1", "999"],
            &["Liner", "Etsy", "Physical", "2023", "5", "15"],
            &["Liner", "Etsy", "eBook", "2023", "5", "7"],
            &["Broken", "AmazonUS", "Physical", "2024", "1", "10"],
        ],
        &[
            &["Widget", "1", "Holiday spike", "", "", "12"],
            &["Widget", "2", "Etsy storefront opened", "2024,2025", "Etsy", ""],
            &["Widget", "3", "Restock delay", "2024", "", "2"],
        ],
    )
}

pub fn sample_catalog() -> ProductCatalog {
    build_catalog(&sample_tables(), &InsightTable::new())
}
