//! In-memory report store.
//!
//! Backed by a `DashMap`; an append holds the shard lock of its report for
//! the whole check-and-apply, so appends to one report are serialized.

use std::path::Path;

use async_trait::async_trait;
use civic_core::{Category, HistoryEntry, Report};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::{ReportStore, StoreError};

/// Thread-safe store keeping every report in memory.
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    reports: DashMap<Uuid, Report>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from existing reports. Duplicate ids are rejected.
    pub fn from_reports(reports: impl IntoIterator<Item = Report>) -> Result<Self, StoreError> {
        let store = Self::new();
        for report in reports {
            store.put(report)?;
        }
        Ok(store)
    }

    /// Seed from a JSON array of reports in the wire format.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let reports: Vec<Report> =
            serde_json::from_str(json).map_err(|e| StoreError::Storage(e.to_string()))?;
        Self::from_reports(reports)
    }

    /// Seed from a JSON fixture file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Storage(format!("{}: {}", path.display(), e)))?;
        let store = Self::from_json(&json)?;
        debug!(path = %path.display(), reports = store.len(), "Seeded report store");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    fn put(&self, report: Report) -> Result<(), StoreError> {
        match self.reports.entry(report.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(report.id)),
            Entry::Vacant(slot) => {
                slot.insert(report);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn fetch_by_category(&self, category: Category) -> Result<Vec<Report>, StoreError> {
        let mut reports: Vec<Report> = self
            .reports
            .iter()
            .filter(|r| r.category == category)
            .map(|r| r.value().clone())
            .collect();
        reports.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        Ok(reports)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Report>, StoreError> {
        Ok(self.reports.get(&id).map(|r| r.value().clone()))
    }

    async fn insert(&self, report: Report) -> Result<(), StoreError> {
        let id = report.id;
        self.put(report)?;
        debug!(report_id = %id, "Report stored");
        Ok(())
    }

    async fn append(&self, id: Uuid, entry: HistoryEntry) -> Result<Report, StoreError> {
        let mut stored = self.reports.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        let expected = stored.progress().saturating_add(1);
        if entry.progress() != expected {
            return Err(StoreError::ConcurrentModification {
                report_id: id,
                expected,
                found: entry.progress(),
            });
        }

        stored.apply(entry)?;
        debug!(report_id = %id, progress = stored.progress(), "History entry appended");
        Ok(stored.value().clone())
    }
}
