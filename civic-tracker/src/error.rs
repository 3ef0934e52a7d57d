//! Error types for the tracker service.

use civic_core::{GeoError, GibberishReason, IndexError, LifecycleError};
use uuid::Uuid;

use crate::store::StoreError;

/// Errors surfaced by [`crate::ReportService`].
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Moderation flagged the submission
    #[error("Report rejected: {field} {reason}")]
    Rejected { field: String, reason: GibberishReason },

    #[error("Configuration error: {0}")]
    Config(String),

    /// The store kept reporting concurrent modifications
    #[error("Gave up on report {report_id} after {attempts} attempts")]
    RetriesExhausted { report_id: Uuid, attempts: u32 },
}

pub type Result<T> = std::result::Result<T, TrackerError>;
