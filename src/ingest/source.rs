//! Table sources.
//!
//! Each source knows how to fetch one table by kind; `fetch_all`
//! retrieves the three tables concurrently and fails as a whole if any
//! of them fails.

use super::{parse_csv, IngestError, RawTables, RowTable, TableKind};
use crate::config::{SourceConfig, SourceKind, TableNames};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const CSV_EXPORT_BASE: &str = "https://docs.google.com/spreadsheets/d";

/// Where the tables come from.
pub enum TableSource {
    /// Authenticated Sheets API values endpoint
    SheetsApi(SheetsApiSource),
    /// Public CSV export of each sheet
    CsvExport(CsvExportSource),
    /// CSV files in a local directory
    Local(LocalSource),
}

/// Reads ranges through the Sheets v4 values endpoint.
pub struct SheetsApiSource {
    client: reqwest::Client,
    sheet_id: String,
    api_key: Option<String>,
    ranges: TableNames,
}

/// Reads sheets through the public CSV export.
pub struct CsvExportSource {
    client: reqwest::Client,
    sheet_id: String,
    sheets: TableNames,
}

/// Reads CSV files from a directory.
pub struct LocalSource {
    dir: PathBuf,
    files: TableNames,
}

/// Body of a Sheets API values response. `values` is omitted for an
/// empty range.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl TableSource {
    /// Build a source from configuration.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        match config.kind {
            SourceKind::SheetsApi => {
                if config.sheet_id.is_empty() {
                    anyhow::bail!("A sheet id is required for the sheets-api source");
                }
                Ok(TableSource::SheetsApi(SheetsApiSource {
                    client: build_client(config.timeout_seconds)?,
                    sheet_id: config.sheet_id.clone(),
                    api_key: config.api_key.clone().filter(|key| !key.is_empty()),
                    ranges: config.ranges.clone(),
                }))
            }
            SourceKind::CsvExport => {
                if config.sheet_id.is_empty() {
                    anyhow::bail!("A sheet id is required for the csv-export source");
                }
                Ok(TableSource::CsvExport(CsvExportSource {
                    client: build_client(config.timeout_seconds)?,
                    sheet_id: config.sheet_id.clone(),
                    sheets: config.sheets.clone(),
                }))
            }
            SourceKind::Local => Ok(TableSource::Local(LocalSource {
                dir: PathBuf::from(&config.data_dir),
                files: config.files.clone(),
            })),
        }
    }

    /// Human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            TableSource::SheetsApi(s) => format!("Sheets API (sheet {})", s.sheet_id),
            TableSource::CsvExport(s) => format!("CSV export (sheet {})", s.sheet_id),
            TableSource::Local(s) => format!("local CSV files in {}", s.dir.display()),
        }
    }

    /// Fetch a single table.
    pub async fn fetch(&self, kind: TableKind) -> Result<RowTable, IngestError> {
        let table = match self {
            TableSource::SheetsApi(s) => s.fetch(kind).await?,
            TableSource::CsvExport(s) => s.fetch(kind).await?,
            TableSource::Local(s) => s.fetch(kind).await?,
        };
        debug!("Fetched {} table: {} data rows", kind, table.records().len());
        Ok(table)
    }

    /// Fetch all three tables.
    pub async fn fetch_all(&self) -> Result<RawTables, IngestError> {
        info!("Fetching tables from {}", self.describe());

        let (config, sales, notes) = futures::try_join!(
            self.fetch(TableKind::Config),
            self.fetch(TableKind::Sales),
            self.fetch(TableKind::Notes),
        )?;

        Ok(RawTables {
            config,
            sales,
            notes,
        })
    }
}

impl SheetsApiSource {
    async fn fetch(&self, kind: TableKind) -> Result<RowTable, IngestError> {
        let url = format!(
            "{}/{}/values/{}",
            SHEETS_API_BASE,
            self.sheet_id,
            self.ranges.get(kind)
        );

        let mut request = self.client.get(&url);
        if let Some(ref key) = self.api_key {
            request = request.query(&[("key", key)]);
        }

        let body = send(request, kind).await?;
        parse_value_range(kind, &body)
    }
}

impl CsvExportSource {
    async fn fetch(&self, kind: TableKind) -> Result<RowTable, IngestError> {
        let url = format!("{}/{}/gviz/tq", CSV_EXPORT_BASE, self.sheet_id);
        let request = self
            .client
            .get(&url)
            .query(&[("tqx", "out:csv"), ("sheet", self.sheets.get(kind))]);

        let body = send(request, kind).await?;
        parse_csv(kind, &body)
    }
}

impl LocalSource {
    async fn fetch(&self, kind: TableKind) -> Result<RowTable, IngestError> {
        let path = self.dir.join(self.files.get(kind));
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| IngestError::Io {
                table: kind,
                path: path.clone(),
                source,
            })?;
        parse_csv(kind, &text)
    }
}

fn build_client(timeout_seconds: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .context("Failed to create HTTP client")
}

/// Send a request and return the body of a successful response.
async fn send(request: reqwest::RequestBuilder, kind: TableKind) -> Result<String, IngestError> {
    let response = request
        .send()
        .await
        .map_err(|source| IngestError::Http { table: kind, source })?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::Status {
            table: kind,
            status,
        });
    }

    response
        .text()
        .await
        .map_err(|source| IngestError::Http { table: kind, source })
}

/// Convert a Sheets API values body into a table. Non-string cells are
/// rendered with their JSON text; nulls become empty cells.
fn parse_value_range(kind: TableKind, body: &str) -> Result<RowTable, IngestError> {
    let range: ValueRange = serde_json::from_str(body).map_err(|e| IngestError::Json {
        table: kind,
        message: e.to_string(),
    })?;

    let rows = range
        .values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect();

    Ok(RowTable::new(rows))
}
