//! Query engine.
//!
//! Rollups over a single product: yearly, per-platform and monthly
//! totals, the growth-factor forecast and proportion-chart shares. Every
//! query takes an explicit `QueryContext`; nothing here holds state.

use crate::models::{
    Forecast, ForecastActual, MonthlyPoint, PieShares, PlatformTotal, Product, SalesTotals,
    SummaryRow, YearlyTotal, ALL, MONTH_LABELS, PHYSICAL,
};

/// Year whose actuals are scaled by the growth factor.
pub const FORECAST_BASE_YEAR: &str = "2024";

/// Year being forecast.
pub const FORECAST_TARGET_YEAR: &str = "2025";

const MONTH_KEYS: [&str; 12] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12"];

/// Year and platform filters for a query. Either may be "All".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryContext<'a> {
    pub year: &'a str,
    pub platform: &'a str,
}

impl<'a> QueryContext<'a> {
    pub fn new(year: &'a str, platform: &'a str) -> Self {
        Self { year, platform }
    }
}

/// Real platforms for "All", otherwise just the named one.
fn platforms_in_scope<'a>(product: &'a Product, filter: &'a str) -> Vec<&'a str> {
    if filter == ALL {
        product.config.real_platforms().collect()
    } else {
        vec![filter]
    }
}

/// Real years for "All", otherwise just the named one.
fn years_in_scope<'a>(product: &'a Product, filter: &'a str) -> Vec<&'a str> {
    if filter == ALL {
        product.config.real_years().collect()
    } else {
        vec![filter]
    }
}

/// Sum physical and (when tracked) ebook units over every combination
/// of the given keys. Sums saturate at `u64::MAX`.
fn sum_units(product: &Product, platforms: &[&str], years: &[&str], months: &[&str]) -> SalesTotals {
    let config = &product.config;
    let ebook_type = config.ebook_type();

    let mut physical: u64 = 0;
    let mut ebook: u64 = 0;

    for platform in platforms {
        for year in years {
            for month in months {
                physical =
                    physical.saturating_add(product.sales.get(platform, PHYSICAL, year, month));
                if config.has_ebooks {
                    ebook = ebook.saturating_add(product.sales.get(platform, ebook_type, year, month));
                }
            }
        }
    }

    SalesTotals::new(physical, ebook)
}

/// Totals for one year across the platforms in scope.
fn year_totals(product: &Product, platform_filter: &str, year: &str) -> SalesTotals {
    let platforms = platforms_in_scope(product, platform_filter);
    sum_units(product, &platforms, &[year], &MONTH_KEYS)
}

/// One record per real year, scoped to the platform filter.
pub fn yearly_totals(product: &Product, ctx: &QueryContext<'_>) -> Vec<YearlyTotal> {
    product
        .config
        .real_years()
        .map(|year| YearlyTotal {
            year: year.to_string(),
            totals: year_totals(product, ctx.platform, year),
        })
        .collect()
}

/// One record per real platform, scoped to the year filter.
pub fn platform_totals(product: &Product, ctx: &QueryContext<'_>) -> Vec<PlatformTotal> {
    let years = years_in_scope(product, ctx.year);

    product
        .config
        .real_platforms()
        .map(|platform| PlatformTotal {
            platform: platform.to_string(),
            totals: sum_units(product, &[platform], &years, &MONTH_KEYS),
        })
        .collect()
}

/// Twelve calendar months for the selected year. Empty when the year
/// filter is "All".
pub fn monthly_series(product: &Product, ctx: &QueryContext<'_>) -> Vec<MonthlyPoint> {
    if ctx.year == ALL {
        return Vec::new();
    }

    let platforms = platforms_in_scope(product, ctx.platform);

    MONTH_KEYS
        .into_iter()
        .zip(MONTH_LABELS)
        .zip(1u8..)
        .map(|((key, label), month)| MonthlyPoint {
            month,
            label: label.to_string(),
            totals: sum_units(product, &platforms, &[ctx.year], &[key]),
            note_ids: Vec::new(),
        })
        .collect()
}

/// Forecast for the target year, scaled from the base year's actuals
/// within the platform filter.
///
/// Absent when the product has no base-year data or no usable growth
/// factor. Actual target-year figures are attached when present.
pub fn forecast(product: &Product, ctx: &QueryContext<'_>) -> Option<Forecast> {
    let config = &product.config;
    if !config.has_year(FORECAST_BASE_YEAR) {
        return None;
    }
    let growth_factor = config.growth_factor?;

    let base = year_totals(product, ctx.platform, FORECAST_BASE_YEAR);
    let physical = scale(base.physical, growth_factor);
    let ebook = if config.has_ebooks {
        scale(base.ebook, growth_factor)
    } else {
        0
    };
    let totals = SalesTotals::new(physical, ebook);

    let actual = config.has_year(FORECAST_TARGET_YEAR).then(|| {
        let actual = year_totals(product, ctx.platform, FORECAST_TARGET_YEAR);
        ForecastActual {
            completion_percent: completion_percent(actual.total, totals.total),
            totals: actual,
        }
    });

    Some(Forecast {
        label: format!("{} (Forecast)", FORECAST_TARGET_YEAR),
        base_year: FORECAST_BASE_YEAR.to_string(),
        target_year: FORECAST_TARGET_YEAR.to_string(),
        growth_factor,
        totals,
        actual,
    })
}

fn scale(units: u64, factor: f64) -> u64 {
    (units as f64 * factor).round() as u64
}

/// The forecast is only shown for "All" or the target year.
pub fn forecast_visible(year_filter: &str) -> bool {
    year_filter == ALL || year_filter == FORECAST_TARGET_YEAR
}

/// Actual as a rounded percentage of forecast; 0 for a zero forecast.
pub fn completion_percent(actual: u64, forecast: u64) -> u64 {
    if forecast == 0 {
        return 0;
    }
    (actual as f64 * 100.0 / forecast as f64).round() as u64
}

/// Per-platform series for a proportion chart, from the platform totals
/// for the year filter.
pub fn pie_shares(product: &Product, ctx: &QueryContext<'_>) -> PieShares {
    let totals = platform_totals(product, ctx);

    PieShares {
        labels: totals.iter().map(|t| t.platform.clone()).collect(),
        physical: totals.iter().map(|t| t.totals.physical).collect(),
        ebook: product
            .config
            .has_ebooks
            .then(|| totals.iter().map(|t| t.totals.ebook).collect()),
    }
}

/// `value` as a percentage of `total`; 0.0 when the total is zero.
pub fn share_percent(value: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    value as f64 / total as f64 * 100.0
}

/// Percentage text with the given number of decimals, e.g. `"75.1%"`.
pub fn format_share(value: u64, total: u64, decimals: usize) -> String {
    format!("{:.*}%", decimals, share_percent(value, total))
}

/// Most recent real year, comparing years as integers. Years that are
/// not numbers are ignored.
pub fn latest_year(years: &[String]) -> Option<&str> {
    years
        .iter()
        .filter(|year| year.as_str() != ALL)
        .filter_map(|year| year.trim().parse::<i64>().ok().map(|n| (n, year.as_str())))
        .max_by_key(|(n, _)| *n)
        .map(|(_, year)| year)
}

/// Yearly rows followed by the forecast row, if one is given.
pub fn summary_rows(yearly: &[YearlyTotal], forecast: Option<&Forecast>) -> Vec<SummaryRow> {
    let mut rows: Vec<SummaryRow> = yearly
        .iter()
        .map(|y| SummaryRow {
            label: y.year.clone(),
            totals: y.totals,
            is_forecast: false,
        })
        .collect();

    if let Some(forecast) = forecast {
        rows.push(SummaryRow {
            label: forecast.label.clone(),
            totals: forecast.totals,
            is_forecast: true,
        });
    }

    rows
}

/// Plain-language description of how the forecast was derived.
pub fn forecast_explanation(forecast: &Forecast) -> String {
    let growth = ((forecast.growth_factor - 1.0) * 100.0).round();
    let mut text = format!(
        "The {} forecast multiplies {} actual sales by a growth factor of {} ({:+}% growth), \
         for a target of {} units.",
        forecast.target_year, forecast.base_year, forecast.growth_factor, growth, forecast.totals.total
    );

    if let Some(ref actual) = forecast.actual {
        text.push_str(&format!(
            " {} sales to date: {} units, {}% of forecast.",
            forecast.target_year, actual.totals.total, actual.completion_percent
        ));
    }

    text
}
