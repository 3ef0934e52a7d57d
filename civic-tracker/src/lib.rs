//! Civic tracker service
//!
//! Hosts the report lifecycle behind a [`ReportStore`], screens submissions,
//! and serves map clusters, the tracker timeline, search and dashboard
//! snapshots. Pollutant readings are indexed on ingest.

pub mod config;
pub mod error;
pub mod service;
pub mod store;

pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use service::{IndexReading, ReadingOutcome, ReportService};
pub use store::{InMemoryReportStore, ReportStore, StoreError};
