//! Aggregate builder.
//!
//! Turns the three flat row tables into a `ProductCatalog`. Malformed
//! rows are dropped; references to undeclared products are logged and
//! dropped. Building never fails.

use crate::ingest::{RawTables, RowTable, TableKind};
use crate::models::{
    InsightTable, Note, NoteConditions, Product, ProductCatalog, ProductConfig, ALL,
};
use tracing::{debug, info, warn};

const CONFIG_COLUMNS: [&str; 4] = ["Product", "HasEbooks", "GrowthFactor", "ProductLabel"];
const SALES_COLUMNS: [&str; 6] = ["Product", "Platform", "Type", "Year", "Month", "Sales"];
const NOTES_COLUMNS: [&str; 6] = [
    "Product",
    "ID",
    "Note",
    "YearCondition",
    "PlatformCondition",
    "MonthCondition",
];

/// Build the full catalog from one fetch of the tables.
pub fn build_catalog(tables: &RawTables, insights: &InsightTable) -> ProductCatalog {
    let mut catalog = ProductCatalog::default();

    load_products(&tables.config, &mut catalog);
    load_sales(&tables.sales, &mut catalog);
    finalize_lists(&mut catalog);
    load_notes(&tables.notes, &mut catalog);
    attach_insights(insights, &mut catalog);

    info!("Built catalog with {} products", catalog.len());
    catalog
}

/// Resolve header positions, warning about any that are missing.
fn columns<const N: usize>(
    table: &RowTable,
    kind: TableKind,
    names: [&str; N],
) -> [Option<usize>; N] {
    names.map(|name| {
        let index = table.column(name);
        if index.is_none() && !table.is_empty() {
            warn!("Column {} missing from {} table", name, kind);
        }
        index
    })
}

/// A non-empty cell, or `None` when the column or cell is missing.
fn cell(row: &[String], column: Option<usize>) -> Option<&str> {
    column
        .and_then(|i| row.get(i))
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

/// Growth factors must be finite and positive to be usable.
fn parse_growth_factor(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|factor| factor.is_finite() && *factor > 0.0)
}

fn parse_units(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

/// Split a condition cell on commas. A missing cell yields an empty list.
fn split_conditions(raw: Option<&String>) -> Vec<String> {
    raw.map(|value| value.split(',').map(String::from).collect())
        .unwrap_or_default()
}

fn load_products(table: &RowTable, catalog: &mut ProductCatalog) {
    let [product, has_ebooks, growth, label] = columns(table, TableKind::Config, CONFIG_COLUMNS);

    for row in table.records() {
        let Some(name) = cell(row, product) else {
            continue;
        };

        let config = ProductConfig::new(
            cell(row, has_ebooks) == Some("TRUE"),
            parse_growth_factor(cell(row, growth)),
            cell(row, label).unwrap_or_default().to_string(),
        );

        if config.growth_factor.is_none() {
            debug!("Product {} has no usable growth factor", name);
        }

        if !catalog.insert_if_absent(name, Product::new(config)) {
            debug!("Ignoring repeated config row for {}", name);
        }
    }
}

fn load_sales(table: &RowTable, catalog: &mut ProductCatalog) {
    let [product_col, platform_col, type_col, year_col, month_col, sales_col] =
        columns(table, TableKind::Sales, SALES_COLUMNS);
    let width = table.width();

    let mut recorded = 0usize;
    let mut skipped = 0usize;

    for row in table.records() {
        if row.len() < width {
            skipped += 1;
            continue;
        }

        let (Some(name), Some(platform), Some(sale_type), Some(year), Some(month)) = (
            cell(row, product_col),
            cell(row, platform_col),
            cell(row, type_col),
            cell(row, year_col),
            cell(row, month_col),
        ) else {
            skipped += 1;
            continue;
        };

        let Some(units) = cell(row, sales_col).and_then(parse_units) else {
            skipped += 1;
            continue;
        };

        let Some(entry) = catalog.get_mut(name) else {
            warn!("Product {} not found in config", name);
            skipped += 1;
            continue;
        };

        record_sale(entry, platform, sale_type, year, month, units);
        recorded += 1;
    }

    debug!("Sales rows: {} recorded, {} skipped", recorded, skipped);
}

/// Store one sales cell and register its year and platform.
fn record_sale(
    product: &mut Product,
    platform: &str,
    sale_type: &str,
    year: &str,
    month: &str,
    units: u64,
) {
    product.sales.upsert(platform, sale_type, year, month, units);

    if !product.config.has_year(year) {
        product.config.years.push(year.to_string());
    }
    if !product.config.has_platform(platform) {
        product.config.platforms.push(platform.to_string());
    }
}

/// Sort years and append the synthetic "All" option to both lists.
fn finalize_lists(catalog: &mut ProductCatalog) {
    for (name, product) in catalog.iter_mut() {
        if product.sales.is_empty() {
            debug!("Product {} has no sales rows", name);
        }
        product.config.years.sort();
        product.config.years.push(ALL.to_string());
        product.config.platforms.push(ALL.to_string());
    }
}

fn load_notes(table: &RowTable, catalog: &mut ProductCatalog) {
    let [product_col, id_col, text_col, years_col, platforms_col, months_col] =
        columns(table, TableKind::Notes, NOTES_COLUMNS);
    let width = table.width();

    let mut attached = 0usize;
    let mut skipped = 0usize;

    for row in table.records() {
        if row.len() < width {
            skipped += 1;
            continue;
        }

        let (Some(name), Some(id), Some(text)) = (
            cell(row, product_col),
            cell(row, id_col).and_then(|raw| raw.trim().parse::<i64>().ok()),
            cell(row, text_col),
        ) else {
            skipped += 1;
            continue;
        };

        let Some(entry) = catalog.get_mut(name) else {
            warn!("Product {} not found in config", name);
            skipped += 1;
            continue;
        };

        entry.notes.push(Note {
            id,
            text: text.to_string(),
            conditions: NoteConditions {
                years: split_conditions(years_col.and_then(|i| row.get(i))),
                platforms: split_conditions(platforms_col.and_then(|i| row.get(i))),
                months: split_conditions(months_col.and_then(|i| row.get(i))),
            },
        });
        attached += 1;
    }

    debug!("Notes rows: {} attached, {} skipped", attached, skipped);
}

fn attach_insights(insights: &InsightTable, catalog: &mut ProductCatalog) {
    for (name, lines) in insights {
        if let Some(product) = catalog.get_mut(name) {
            product.insights = Some(lines.clone());
        }
    }
}
