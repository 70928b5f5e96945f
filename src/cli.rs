//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap, including
//! validation and the commands accepted on stdin in watch mode.

use crate::config::SourceKind;
use crate::models::View;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Salesboard - sales dashboard backed by a spreadsheet
///
/// Loads product configuration, sales rows and notes from a Google
/// spreadsheet (or local CSV files) and renders yearly, monthly and
/// per-platform rollups with a growth forecast.
///
/// Examples:
///   salesboard --sheet-id 1AbC... --product Cookbook
///   salesboard --source local --data-dir ./data --view platform --year 2024
///   salesboard --watch --interval 120
///   salesboard --format json --output dashboard.json
///   salesboard --init-config
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .salesboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Where to read the tables from
    #[arg(long, value_name = "KIND")]
    pub source: Option<SourceKind>,

    /// Spreadsheet identifier
    #[arg(long, value_name = "ID", env = "SALESBOARD_SHEET_ID")]
    pub sheet_id: Option<String>,

    /// API key for the Sheets values API
    #[arg(long, value_name = "KEY", env = "SALESBOARD_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory holding config.csv, sales.csv and notes.csv
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Product to show first
    #[arg(short, long, value_name = "NAME")]
    pub product: Option<String>,

    /// Initial view
    #[arg(long, value_name = "VIEW")]
    pub view: Option<View>,

    /// Year filter ("All" or a year present in the data)
    #[arg(long, value_name = "YEAR")]
    pub year: Option<String>,

    /// Platform filter ("All" or a platform present in the data)
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the rendered dashboard to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Keep running, refresh periodically and accept commands on stdin
    #[arg(short, long)]
    pub watch: bool,

    /// Refresh interval in seconds for watch mode
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .salesboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the rendered dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(interval) = self.interval {
            if interval == 0 {
                return Err("Refresh interval must be at least 1 second".to_string());
            }
        }

        if self.interval.is_some() && !self.watch {
            return Err("--interval only applies with --watch".to_string());
        }

        if let Some(ref dir) = self.data_dir {
            if !dir.is_dir() {
                return Err(format!("Data directory does not exist: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// A command typed on stdin while watching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Product(String),
    View(View),
    Year(String),
    Platform(String),
    Refresh,
    Help,
    Quit,
}

/// Help text listing the watch-mode commands.
pub const COMMAND_HELP: &str = "\
Commands:
  product <name>      switch product
  view <view>         yearly, monthly or platform
  year <year>         filter by year (All for every year)
  platform <name>     filter by platform (All for every platform)
  refresh             reload data now
  help                show this help
  quit                exit";

impl Command {
    /// Parse one line of input. Blank lines parse to `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let argument = |name: &str| {
            if rest.is_empty() {
                Err(format!("Usage: {} <{}>", word, name))
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match word.to_lowercase().as_str() {
            "product" | "p" => Command::Product(argument("name")?),
            "view" | "v" => {
                let view = View::from_str(&argument("view")?, true)
                    .map_err(|_| format!("Unknown view: {} (yearly, monthly, platform)", rest))?;
                Command::View(view)
            }
            "year" | "y" => Command::Year(argument("year")?),
            "platform" => Command::Platform(argument("platform")?),
            "refresh" | "r" => Command::Refresh,
            "help" | "h" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("Unknown command: {} (type help)", other)),
        };

        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "salesboard",
            "--source",
            "local",
            "--view",
            "monthly",
            "--year",
            "2024",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.source, Some(SourceKind::Local));
        assert_eq!(args.view, Some(View::Monthly));
        assert_eq!(args.year.as_deref(), Some("2024"));
        assert_eq!(args.format, OutputFormat::Json);
        assert!(!args.watch);
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = Args {
            verbose: true,
            quiet: true,
            ..Args::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_interval_needs_watch() {
        let mut args = Args {
            interval: Some(60),
            ..Args::default()
        };
        assert!(args.validate().is_err());

        args.watch = true;
        assert!(args.validate().is_ok());

        args.interval = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_data_dir() {
        let args = Args {
            data_dir: Some(PathBuf::from("/definitely/not/here")),
            ..Args::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = Args::default();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("product Cookbook"),
            Ok(Some(Command::Product("Cookbook".to_string())))
        );
        assert_eq!(
            Command::parse("  platform   Amazon US "),
            Ok(Some(Command::Platform("Amazon US".to_string())))
        );
        assert_eq!(Command::parse("view Monthly"), Ok(Some(Command::View(View::Monthly))));
        assert_eq!(Command::parse("q"), Ok(Some(Command::Quit)));
        assert_eq!(Command::parse("REFRESH"), Ok(Some(Command::Refresh)));
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_parse_command_errors() {
        assert!(Command::parse("year").is_err());
        assert!(Command::parse("view sideways").is_err());
        assert!(Command::parse("dance").is_err());
    }
}
