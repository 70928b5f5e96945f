//! Rebuilding the catalog and keeping refreshes from overlapping.

use crate::analysis::build_catalog;
use crate::ingest::{IngestError, TableSource};
use crate::models::{InsightTable, ProductCatalog};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Fetch every table and build a fresh catalog.
///
/// The previous catalog is never touched here; callers swap the result in.
pub async fn rebuild(
    source: &TableSource,
    insights: &InsightTable,
) -> Result<ProductCatalog, IngestError> {
    let tables = source.fetch_all().await?;
    Ok(build_catalog(&tables, insights))
}

/// Admits at most one refresh at a time.
#[derive(Debug, Clone, Default)]
pub struct RefreshGate {
    in_progress: Arc<AtomicBool>,
}

/// Held for the duration of a refresh; releases the gate on drop.
#[derive(Debug)]
pub struct RefreshPermit {
    in_progress: Arc<AtomicBool>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a refresh, or `None` if one is already running.
    pub fn try_begin(&self) -> Option<RefreshPermit> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshPermit {
                in_progress: Arc::clone(&self.in_progress),
            })
    }
}

impl Drop for RefreshPermit {
    fn drop(&mut self) {
        self.in_progress.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SourceConfig, SourceKind};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_second_refresh_is_refused() {
        let gate = RefreshGate::new();

        let permit = gate.try_begin();
        assert!(permit.is_some());
        assert!(gate.try_begin().is_none());

        drop(permit);
        assert!(gate.try_begin().is_some());
    }

    #[test]
    fn test_gate_shared_between_clones() {
        let gate = RefreshGate::new();
        let other = gate.clone();

        let _permit = gate.try_begin().unwrap();
        assert!(other.try_begin().is_none());
    }

    #[test]
    fn test_rebuild_from_local_files() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.csv"),
            "Product,HasEbooks,GrowthFactor,ProductLabel\nWidget,TRUE,1.2,Widget\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("sales.csv"),
            "Product,Platform,Type,Year,Month,Sales\n\
             Widget,AmazonUS,Physical,2024,1,100\n\
             Widget,AmazonUS,eBook,2024,1,10\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("notes.csv"),
            "Product,ID,Note,YearCondition,PlatformCondition,MonthCondition\n\
             Widget,1,Launch month,2024,,1\n",
        )
        .unwrap();

        let source = TableSource::from_config(&SourceConfig {
            kind: SourceKind::Local,
            data_dir: dir.path().to_string_lossy().to_string(),
            ..SourceConfig::default()
        })
        .unwrap();

        let catalog = tokio_test::block_on(rebuild(&source, &InsightTable::new())).unwrap();
        let widget = catalog.get("Widget").unwrap();
        assert_eq!(widget.config.years, vec!["2024", "All"]);
        assert_eq!(widget.notes.len(), 1);
    }
}
