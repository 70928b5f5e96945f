//! Transport errors for table retrieval.

use super::TableKind;
use std::path::PathBuf;
use thiserror::Error;

/// A failure to retrieve one of the tables. Any of these aborts the
/// rebuild in progress.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The HTTP request could not be completed
    #[error("Request for {table} table failed: {source}")]
    Http {
        table: TableKind,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("HTTP error fetching {table} table: status {status}")]
    Status {
        table: TableKind,
        status: reqwest::StatusCode,
    },

    /// The response body was not the expected JSON
    #[error("Malformed response for {table} table: {message}")]
    Json { table: TableKind, message: String },

    /// The CSV body could not be read
    #[error("Malformed CSV in {table} table: {source}")]
    Csv {
        table: TableKind,
        #[source]
        source: csv::Error,
    },

    /// A local table file could not be read
    #[error("Failed to read {table} table from {}: {source}", .path.display())]
    Io {
        table: TableKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    /// The table whose retrieval failed.
    pub fn table(&self) -> TableKind {
        match self {
            IngestError::Http { table, .. }
            | IngestError::Status { table, .. }
            | IngestError::Json { table, .. }
            | IngestError::Csv { table, .. }
            | IngestError::Io { table, .. } => *table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let err = IngestError::Status {
            table: TableKind::Sales,
            status: reqwest::StatusCode::FORBIDDEN,
        };
        assert_eq!(err.table(), TableKind::Sales);
        assert!(err.to_string().contains("sales"));
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = IngestError::Io {
            table: TableKind::Notes,
            path: PathBuf::from("data/notes.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("data/notes.csv"));
    }
}
