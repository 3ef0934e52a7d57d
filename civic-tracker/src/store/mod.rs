//! Report persistence boundary.
//!
//! The store owns persisted reports and serializes appends to the same
//! report. Lifecycle rules live in `civic-core`; a store only checks that an
//! entry extends the version it currently holds.

mod memory;

use async_trait::async_trait;
use civic_core::{Category, HistoryEntry, LifecycleError, Report};
use uuid::Uuid;

pub use memory::InMemoryReportStore;

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The stored report moved on since the caller read it
    #[error("Report {report_id} was modified concurrently (expected progress {expected}, found {found})")]
    ConcurrentModification {
        report_id: Uuid,
        expected: u8,
        found: u8,
    },

    #[error("Report not found: {0}")]
    NotFound(Uuid),

    #[error("Report already exists: {0}")]
    Duplicate(Uuid),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Backend failure (I/O, decoding)
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Persistence for reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Reports of one category, ordered by submission time then id.
    async fn fetch_by_category(&self, category: Category) -> Result<Vec<Report>, StoreError>;

    /// Every report, grouped by category.
    async fn fetch_all(&self) -> Result<Vec<Report>, StoreError> {
        let mut all = Vec::new();
        for category in Category::all() {
            all.extend(self.fetch_by_category(category).await?);
        }
        Ok(all)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Report>, StoreError>;

    /// Persist a new report. Ids are unique.
    async fn insert(&self, report: Report) -> Result<(), StoreError>;

    /// Append a history entry and return the updated report.
    ///
    /// Fails with [`StoreError::ConcurrentModification`] unless the entry's
    /// progress is exactly one past the stored progress.
    async fn append(&self, id: Uuid, entry: HistoryEntry) -> Result<Report, StoreError>;
}
