//! Markdown report generation.
//!
//! Renders a computed `DashboardView` as Markdown: summary table, the
//! section for the active view, forecast, notes and insights.

use crate::analysis::query::format_share;
use crate::models::{DashboardView, MonthlyPoint, Note, PieShares, SalesTotals, View};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Width of the longest bar in the yearly chart.
const BAR_WIDTH: u64 = 40;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(view: &DashboardView) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {} Sales Dashboard\n\n", view.product));

    if let Some(ref banner) = view.banner {
        output.push_str(&format!("> ⚠️ {}\n\n", banner));
    }

    output.push_str(&generate_selection_section(view));
    output.push_str(&generate_summary_section(view));

    match view.view {
        View::Yearly => output.push_str(&generate_yearly_section(view)),
        View::Monthly => output.push_str(&generate_monthly_section(view)),
        View::Platform => output.push_str(&generate_platform_section(view)),
    }

    output.push_str(&generate_forecast_section(view));
    output.push_str(&generate_notes_section(&view.notes));
    output.push_str(&generate_insights_section(&view.insights));
    output.push_str(&generate_footer(view));

    output
}

/// Generate the selection metadata.
fn generate_selection_section(view: &DashboardView) -> String {
    let mut section = String::new();

    section.push_str(&format!("- **Product:** {}\n", view.product));
    section.push_str(&format!("- **View:** {}\n", view.view));

    let year_state = if view.controls.year_enabled { "" } else { " (n/a in this view)" };
    section.push_str(&format!("- **Year:** {}{}\n", view.year, year_state));

    let platform_state = if view.controls.platform_enabled {
        ""
    } else {
        " (n/a in this view)"
    };
    section.push_str(&format!("- **Platform:** {}{}\n", view.platform, platform_state));
    section.push_str(&format!("- **Products:** {}\n", view.products.join(", ")));
    section.push('\n');

    section
}

/// Header row and separator for a totals table.
fn table_header(first: &str, view: &DashboardView) -> String {
    if view.has_ebooks {
        format!(
            "| {} | {} | {} | Total |\n|---|---:|---:|---:|\n",
            first, view.labels.physical, view.labels.ebook
        )
    } else {
        format!(
            "| {} | {} | Total |\n|---|---:|---:|\n",
            first, view.labels.physical
        )
    }
}

fn table_row(label: &str, totals: &SalesTotals, has_ebooks: bool) -> String {
    if has_ebooks {
        format!(
            "| {} | {} | {} | {} |\n",
            label, totals.physical, totals.ebook, totals.total
        )
    } else {
        format!("| {} | {} | {} |\n", label, totals.physical, totals.total)
    }
}

/// Generate the summary table.
fn generate_summary_section(view: &DashboardView) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    if view.summary.is_empty() {
        section.push_str("No sales recorded for this selection.\n\n");
        return section;
    }

    section.push_str(&table_header("Year", view));
    for row in &view.summary {
        let label = if row.is_forecast {
            format!("*{}*", row.label)
        } else {
            row.label.clone()
        };
        section.push_str(&table_row(&label, &row.totals, view.has_ebooks));
    }
    section.push('\n');

    section
}

/// Yearly totals as text bars scaled to the largest year.
fn generate_yearly_section(view: &DashboardView) -> String {
    let mut section = String::new();

    section.push_str("## Yearly Sales\n\n");

    let max = view.yearly.iter().map(|y| y.totals.total).max().unwrap_or(0);
    if max == 0 {
        section.push_str("No sales recorded.\n\n");
        return section;
    }

    section.push_str("```\n");
    for year in &view.yearly {
        let width = (u128::from(year.totals.total) * u128::from(BAR_WIDTH))
            .div_ceil(u128::from(max)) as usize;
        section.push_str(&format!(
            "{:>6} | {:<w$} {}\n",
            year.year,
            "█".repeat(width),
            year.totals.total,
            w = BAR_WIDTH as usize
        ));
    }
    section.push_str("```\n\n");

    section
}

/// Note marker for a monthly row, e.g. `[1, 3]`.
fn note_markers(point: &MonthlyPoint) -> String {
    if point.note_ids.is_empty() {
        return String::new();
    }
    let ids: Vec<String> = point.note_ids.iter().map(|id| id.to_string()).collect();
    format!(" [{}]", ids.join(", "))
}

/// Monthly breakdown for the selected year.
fn generate_monthly_section(view: &DashboardView) -> String {
    let mut section = String::new();

    section.push_str("## Monthly Sales\n\n");

    if view.monthly.is_empty() {
        section.push_str("Select a specific year to see the monthly breakdown.\n\n");
        return section;
    }

    section.push_str(&table_header(&format!("Month ({})", view.year), view));
    for point in &view.monthly {
        let label = format!("{}{}", point.label, note_markers(point));
        section.push_str(&table_row(&label, &point.totals, view.has_ebooks));
    }
    section.push('\n');

    section
}

/// Platform totals plus their share of all sales.
fn generate_platform_section(view: &DashboardView) -> String {
    let mut section = String::new();

    section.push_str("## Sales by Platform\n\n");

    if view.platform_totals.is_empty() {
        section.push_str("No platforms recorded.\n\n");
        return section;
    }

    section.push_str(&table_header("Platform", view));
    for platform in &view.platform_totals {
        section.push_str(&table_row(&platform.platform, &platform.totals, view.has_ebooks));
    }
    section.push('\n');

    section.push_str(&generate_share_section(&view.pie, view));

    section
}

/// Share table at one decimal, legend at zero decimals, both from the
/// same grand total.
fn generate_share_section(pie: &PieShares, view: &DashboardView) -> String {
    let mut section = String::new();
    let grand_total = pie.grand_total();

    section.push_str("### Share of Sales\n\n");

    let ebook = pie.ebook.as_deref();
    if ebook.is_some() {
        section.push_str(&format!(
            "| Platform | {} | {} |\n|---|---:|---:|\n",
            view.labels.physical, view.labels.ebook
        ));
    } else {
        section.push_str(&format!(
            "| Platform | {} |\n|---|---:|\n",
            view.labels.physical
        ));
    }

    for (i, label) in pie.labels.iter().enumerate() {
        let physical = pie.physical.get(i).copied().unwrap_or(0);
        match ebook {
            Some(series) => {
                let digital = series.get(i).copied().unwrap_or(0);
                section.push_str(&format!(
                    "| {} | {} | {} |\n",
                    label,
                    format_share(physical, grand_total, 1),
                    format_share(digital, grand_total, 1)
                ));
            }
            None => section.push_str(&format!(
                "| {} | {} |\n",
                label,
                format_share(physical, grand_total, 1)
            )),
        }
    }
    section.push('\n');

    let mut legend = Vec::new();
    for (i, label) in pie.labels.iter().enumerate() {
        let physical = pie.physical.get(i).copied().unwrap_or(0);
        legend.push(format!(
            "{} {}: {}",
            label,
            view.labels.physical,
            format_share(physical, grand_total, 0)
        ));
        if let Some(digital) = ebook.and_then(|series| series.get(i)) {
            legend.push(format!(
                "{} {}: {}",
                label,
                view.labels.ebook,
                format_share(*digital, grand_total, 0)
            ));
        }
    }
    section.push_str(&format!("Legend: {}\n\n", legend.join(" · ")));

    section
}

/// Forecast explanation, when a forecast is shown.
fn generate_forecast_section(view: &DashboardView) -> String {
    let Some(ref explanation) = view.forecast_explanation else {
        return String::new();
    };

    format!("## Forecast\n\n{}\n\n", explanation)
}

fn generate_notes_section(notes: &[Note]) -> String {
    if notes.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Notes\n\n");
    for note in notes {
        section.push_str(&format!("- **[{}]** {}\n", note.id, note.text));
    }
    section.push('\n');

    section
}

fn generate_insights_section(insights: &[String]) -> String {
    if insights.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Key Insights\n\n");
    for insight in insights {
        section.push_str(&format!("- {}\n", insight));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer(view: &DashboardView) -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    match view.refreshed_at {
        Some(at) => footer.push_str(&format!(
            "*Data refreshed {}*\n",
            at.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        None => footer.push_str("*Data not yet loaded*\n"),
    }

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(view: &DashboardView) -> Result<String> {
    serde_json::to_string_pretty(view).map_err(Into::into)
}

/// Write rendered output to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}
