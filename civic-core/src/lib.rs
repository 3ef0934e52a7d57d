//! Civic report core: lifecycle, pollutant index and map clustering.
//!
//! Citizens submit geotagged waste and water-quality reports; authorities
//! move them through a fixed workflow; the public sees them on a map and a
//! dashboard. This crate holds the parts of that system with real state and
//! computation:
//!
//! - **Lifecycle**: `Pending -> InProgress -> Verified`, one step at a time,
//!   with an append-only timestamped history
//! - **Index**: concentration to index via piecewise-linear breakpoint tables
//! - **Geo**: deterministic per-category clustering of reports for the map
//!
//! Everything here is synchronous and free of I/O. Storage and transport live
//! behind the `ReportStore` boundary in `civic-tracker`.
//!
//! # Example
//!
//! ```
//! use civic_core::{Category, ClusterRadius, Coordinates, GeoAggregator, LifecycleEngine, ReportDraft};
//!
//! let engine = LifecycleEngine::new();
//! let draft = ReportDraft::new(Category::Waste, "Garbage Dump", Coordinates::new(28.6129, 77.2273))
//!     .with_location("Delhi");
//! let report = engine.create(draft).unwrap();
//! let report = engine.advance(&report, "Assigned to waste management").unwrap();
//! assert_eq!(report.progress(), 2);
//!
//! let clusters = GeoAggregator::cluster(&[report], ClusterRadius::Meters(250.0)).unwrap();
//! assert_eq!(clusters.len(), 1);
//! ```

pub mod geo;
pub mod index;
pub mod lifecycle;
pub mod moderation;
pub mod query;
pub mod summary;
pub mod types;

// Re-export main types
pub use geo::{ClusterRadius, Cluster, GeoAggregator, GeoError, GeoPoint};
pub use index::{Breakpoint, BreakpointTable, IndexBand, IndexCalculator, IndexError};
pub use lifecycle::{Clock, FieldError, FixedClock, LifecycleEngine, LifecycleError, SystemClock, TimelineStep};
pub use moderation::{GibberishReason, ModerationPolicy, ModerationVerdict};
pub use query::ReportQuery;
pub use summary::{DashboardSummary, LocationCount};
pub use types::*;
