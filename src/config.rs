//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.salesboard.toml` files.

use crate::ingest::TableKind;
use crate::models::{InsightTable, View};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".salesboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Where the tables come from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Auto-refresh settings.
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Initial selection.
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Free-text insights per product name.
    #[serde(default = "default_insights")]
    pub insights: InsightTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            source: SourceConfig::default(),
            refresh: RefreshConfig::default(),
            dashboard: DashboardConfig::default(),
            insights: default_insights(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Write the rendered dashboard here instead of stdout.
    #[serde(default)]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Transport used to retrieve the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Sheets v4 values API (needs an API key for private sheets)
    SheetsApi,
    /// Public CSV export of a shared sheet
    #[default]
    CsvExport,
    /// CSV files in a local directory
    Local,
}

/// One name per table: a range, a sheet name or a file name depending
/// on the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    pub config: String,
    pub sales: String,
    pub notes: String,
}

impl TableNames {
    pub fn get(&self, kind: TableKind) -> &str {
        match kind {
            TableKind::Config => &self.config,
            TableKind::Sales => &self.sales,
            TableKind::Notes => &self.notes,
        }
    }
}

/// Table source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Transport to use.
    #[serde(default)]
    pub kind: SourceKind,

    /// Spreadsheet id (remote sources).
    #[serde(default)]
    pub sheet_id: String,

    /// API key for the Sheets API.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Directory holding the CSV files (local source).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// A1 ranges for the Sheets API.
    #[serde(default = "default_ranges")]
    pub ranges: TableNames,

    /// Sheet names for the CSV export.
    #[serde(default = "default_sheets")]
    pub sheets: TableNames,

    /// File names for the local source.
    #[serde(default = "default_files")]
    pub files: TableNames,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            sheet_id: String::new(),
            api_key: None,
            data_dir: default_data_dir(),
            timeout_seconds: default_timeout(),
            ranges: default_ranges(),
            sheets: default_sheets(),
            files: default_files(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_ranges() -> TableNames {
    TableNames {
        config: "Product_Config!A1:D100".to_string(),
        sales: "Sales_Data!A1:F10000".to_string(),
        notes: "Notes!A1:F1000".to_string(),
    }
}

fn default_sheets() -> TableNames {
    TableNames {
        config: "Product_Config".to_string(),
        sales: "Sales_Data".to_string(),
        notes: "Notes".to_string(),
    }
}

fn default_files() -> TableNames {
    TableNames {
        config: "config.csv".to_string(),
        sales: "sales.csv".to_string(),
        notes: "notes.csv".to_string(),
    }
}

/// Auto-refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between automatic refreshes in watch mode.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
        }
    }
}

fn default_interval() -> u64 {
    300 // 5 min
}

/// Initial selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Product selected on startup (falls back to the first product).
    #[serde(default = "default_product")]
    pub default_product: String,

    /// View selected on startup.
    #[serde(default)]
    pub default_view: View,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_product: default_product(),
            default_view: View::default(),
        }
    }
}

fn default_product() -> String {
    "Cookbook".to_string()
}

fn default_insights() -> InsightTable {
    [
        (
            "Cookbook",
            [
                "Only product with significant KDP sales",
                "Highest overall sales volume across all platforms",
            ],
        ),
        (
            "Liner",
            [
                "No ClickFunnels sales channel",
                "Significant stock availability issues in 2024",
            ],
        ),
        (
            "Magnet",
            [
                "Strong digital sales component",
                "February 2025 showed unusual sales pattern",
            ],
        ),
        (
            "Thermometer",
            [
                "Newest product in the lineup (2024 launch)",
                "Amazon US is dominant sales channel",
            ],
        ),
    ]
    .into_iter()
    .map(|(product, lines)| {
        (
            product.to_string(),
            lines.into_iter().map(String::from).collect(),
        )
    })
    .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given on the command line (or via env) override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(kind) = args.source {
            self.source.kind = kind;
        }
        if let Some(ref sheet_id) = args.sheet_id {
            self.source.sheet_id = sheet_id.clone();
        }
        if let Some(ref api_key) = args.api_key {
            self.source.api_key = Some(api_key.clone());
        }
        if let Some(ref data_dir) = args.data_dir {
            self.source.data_dir = data_dir.to_string_lossy().to_string();
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }
        if let Some(interval) = args.interval {
            self.refresh.interval_seconds = interval;
        }
        if let Some(ref product) = args.product {
            self.dashboard.default_product = product.clone();
        }
        if let Some(view) = args.view {
            self.dashboard.default_view = view;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.to_string_lossy().to_string());
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that would break a run once merged with CLI arguments.
    pub fn validate(&self) -> Result<()> {
        if self.source.timeout_seconds == 0 {
            anyhow::bail!("source.timeout_seconds must be at least 1");
        }
        if self.refresh.interval_seconds == 0 {
            anyhow::bail!("refresh.interval_seconds must be at least 1");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.kind, SourceKind::CsvExport);
        assert_eq!(config.refresh.interval_seconds, 300);
        assert_eq!(config.dashboard.default_product, "Cookbook");
        assert_eq!(config.source.ranges.get(TableKind::Sales), "Sales_Data!A1:F10000");
        assert_eq!(config.insights.len(), 4);
        assert_eq!(
            config.insights.get("Liner").map(|lines| lines[0].as_str()),
            Some("No ClickFunnels sales channel")
        );
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[source]
kind = "local"
data_dir = "fixtures"

[refresh]
interval_seconds = 60

[dashboard]
default_product = "Magnet"
default_view = "monthly"

[insights]
Magnet = ["Sold out in March"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.source.kind, SourceKind::Local);
        assert_eq!(config.source.data_dir, "fixtures");
        assert_eq!(config.source.files.get(TableKind::Notes), "notes.csv");
        assert_eq!(config.refresh.interval_seconds, 60);
        assert_eq!(config.dashboard.default_view, View::Monthly);
        assert_eq!(config.insights.len(), 1);
        assert_eq!(config.insights["Magnet"], vec!["Sold out in March"]);
    }

    #[test]
    fn test_missing_insights_table_uses_builtin() {
        let config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        assert!(config.general.verbose);
        assert!(config.insights.contains_key("Thermometer"));
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let args = crate::cli::Args {
            source: Some(SourceKind::SheetsApi),
            sheet_id: Some("abc123".to_string()),
            api_key: Some("key".to_string()),
            timeout: Some(5),
            product: Some("Liner".to_string()),
            view: Some(View::Platform),
            ..crate::cli::Args::default()
        };

        config.merge_with_args(&args);

        assert_eq!(config.source.kind, SourceKind::SheetsApi);
        assert_eq!(config.source.sheet_id, "abc123");
        assert_eq!(config.source.api_key.as_deref(), Some("key"));
        assert_eq!(config.source.timeout_seconds, 5);
        assert_eq!(config.refresh.interval_seconds, 300);
        assert_eq!(config.dashboard.default_product, "Liner");
        assert_eq!(config.dashboard.default_view, View::Platform);
        assert!(config.general.output.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_interval_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[refresh]\ninterval_seconds = 0\n").unwrap();

        let config = Config::load(&path).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("interval_seconds"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config: Config = toml::from_str("[source]\ntimeout_seconds = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_value_repairs_file_value() {
        let mut config: Config = toml::from_str("[refresh]\ninterval_seconds = 0\n").unwrap();
        let args = crate::cli::Args {
            watch: true,
            interval: Some(30),
            ..crate::cli::Args::default()
        };

        config.merge_with_args(&args);
        assert!(config.validate().is_ok());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[source]"));
        assert!(toml_str.contains("[refresh]"));
        assert!(toml_str.contains("[insights]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.source.sheets, default_sheets());
    }
}
