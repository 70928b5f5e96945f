//! Row ingestion.
//!
//! Fetches the configuration, sales and notes tables as rows of strings,
//! either from the Sheets API, a public CSV export, or local CSV files.

pub mod error;
pub mod source;

pub use error::IngestError;
pub use source::TableSource;

use std::fmt;

/// The three tables the dashboard is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Config,
    Sales,
    Notes,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Config => write!(f, "config"),
            TableKind::Sales => write!(f, "sales"),
            TableKind::Notes => write!(f, "notes"),
        }
    }
}

/// A table of string cells. Row 0 is the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowTable {
    rows: Vec<Vec<String>>,
}

impl RowTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Builds a table from string literals.
    #[cfg(test)]
    pub fn from_strs(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        )
    }

    /// The header row, or an empty slice for an empty table.
    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Data rows (everything after the header).
    pub fn records(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Number of header columns.
    pub fn width(&self) -> usize {
        self.header().len()
    }

    /// Index of the column with the given header name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header().iter().position(|h| h == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One fetch of all three tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTables {
    pub config: RowTable,
    pub sales: RowTable,
    pub notes: RowTable,
}

/// Parses CSV text into a table, keeping the header as row 0.
///
/// Record lengths may vary; a leading UTF-8 BOM is ignored.
pub fn parse_csv(kind: TableKind, text: &str) -> Result<RowTable, IngestError> {
    let text = text.trim_start_matches('\u{FEFF}');

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| IngestError::Csv { table: kind, source })?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok(RowTable::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_lookup_by_name() {
        let table = RowTable::from_strs(&[&["Sales", "Product"], &["10", "Widget"]]);

        assert_eq!(table.column("Product"), Some(1));
        assert_eq!(table.column("Sales"), Some(0));
        assert_eq!(table.column("Missing"), None);
        assert_eq!(table.records().len(), 1);
    }

    #[test]
    fn test_empty_table() {
        let table = RowTable::default();
        assert!(table.header().is_empty());
        assert!(table.records().is_empty());
        assert_eq!(table.width(), 0);
    }

    #[test]
    fn test_parse_csv_keeps_header_and_ragged_rows() {
        let text = "\u{FEFF}Product,HasEbooks,GrowthFactor,ProductLabel\n\
                    Cookbook,TRUE,1.2,Cookbook\n\
                    Liner,FALSE\n";
        let table = parse_csv(TableKind::Config, text).unwrap();

        assert_eq!(table.header()[0], "Product");
        assert_eq!(table.records().len(), 2);
        assert_eq!(table.records()[1], vec!["Liner", "FALSE"]);
    }

    #[test]
    fn test_parse_csv_quoted_commas() {
        let text = "Product,ID,Note,YearCondition,PlatformCondition,MonthCondition\n\
                    Cookbook,1,\"Launch, then restock\",\"2023,2024\",,12\n";
        let table = parse_csv(TableKind::Notes, text).unwrap();
        let row = &table.records()[0];

        assert_eq!(row[2], "Launch, then restock");
        assert_eq!(row[3], "2023,2024");
        assert_eq!(row[4], "");
    }
}
