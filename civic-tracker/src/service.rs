//! Report service: the tracker's entry point.
//!
//! Wires the lifecycle engine, index calculator and geo aggregator to a
//! [`ReportStore`]. The core stays pure; every read and write of persisted
//! state goes through the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use civic_core::{
    Category, Clock, Cluster, ClusterRadius, Coordinates, DashboardSummary, GeoAggregator,
    HistoryEntry, IndexBand, IndexCalculator, LifecycleEngine, LifecycleError, Measurement,
    ModerationPolicy, ModerationVerdict, Report, ReportDraft, ReportQuery, ReportStatus,
    SystemClock, TimelineStep,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ClusteringConfig, TrackerConfig};
use crate::error::{Result, TrackerError};
use crate::store::{ReportStore, StoreError};

/// Index outcome for one measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReadingOutcome {
    Index { value: u32, band: IndexBand },
    /// The measurement could not be indexed; never defaulted to 0
    Unknown { reason: String },
}

/// A measurement paired with its index outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexReading {
    pub pollutant: String,
    pub coordinates: Coordinates,
    pub timestamp: DateTime<Utc>,
    pub outcome: ReadingOutcome,
}

impl IndexReading {
    pub fn value(&self) -> Option<u32> {
        match self.outcome {
            ReadingOutcome::Index { value, .. } => Some(value),
            ReadingOutcome::Unknown { .. } => None,
        }
    }
}

/// Report tracking service.
pub struct ReportService<C: Clock = SystemClock> {
    store: Arc<dyn ReportStore>,
    engine: LifecycleEngine<C>,
    calculator: IndexCalculator,
    moderation: Option<ModerationPolicy>,
    clustering: ClusteringConfig,
    max_retries: u32,
}

impl ReportService<SystemClock> {
    /// Service on the wall clock.
    pub fn new(store: Arc<dyn ReportStore>, config: &TrackerConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<C: Clock> ReportService<C> {
    /// Service on a custom clock.
    pub fn with_clock(store: Arc<dyn ReportStore>, config: &TrackerConfig, clock: C) -> Self {
        Self {
            store,
            engine: LifecycleEngine::with_clock(clock)
                .with_submitted_note(config.lifecycle.submitted_note.clone()),
            calculator: config.index.calculator(),
            moderation: config.moderation.policy(),
            clustering: config.clustering.clone(),
            max_retries: config.store.max_retries.max(1),
        }
    }

    pub fn calculator(&self) -> &IndexCalculator {
        &self.calculator
    }

    /// Validate, screen and persist a new report.
    pub async fn submit(&self, draft: ReportDraft) -> Result<Report> {
        if let Some(policy) = &self.moderation {
            if let ModerationVerdict::Rejected { field, reason } =
                policy.screen(&draft.title, &draft.description)
            {
                warn!(field = %field, reason = %reason, "Submission rejected by moderation");
                return Err(TrackerError::Rejected { field, reason });
            }
        }

        let report = self.engine.create(draft)?;
        self.store.insert(report.clone()).await?;
        info!(
            report_id = %report.id,
            category = %report.category,
            location = %report.location,
            "Report submitted"
        );
        Ok(report)
    }

    pub async fn get(&self, id: Uuid) -> Result<Report> {
        self.store
            .get(id)
            .await?
            .ok_or(TrackerError::Store(StoreError::NotFound(id)))
    }

    /// Move a report one level forward.
    pub async fn advance(&self, id: Uuid, note: &str) -> Result<Report> {
        self.transition(id, None, note).await
    }

    /// Move a report to `target`, which must be its next status.
    pub async fn advance_to(&self, id: Uuid, target: ReportStatus, note: &str) -> Result<Report> {
        self.transition(id, Some(target), note).await
    }

    /// The target is fixed on the first read. A retry after a lost race
    /// never carries the note on to a later stage.
    async fn transition(&self, id: Uuid, target: Option<ReportStatus>, note: &str) -> Result<Report> {
        let mut pinned = target;
        for attempt in 1..=self.max_retries {
            let report = self.get(id).await?;
            let target = match pinned.or_else(|| report.status().next()) {
                Some(target) => {
                    pinned = Some(target);
                    target
                }
                None => {
                    return Err(LifecycleError::InvalidTransition {
                        report_id: id,
                        from: report.status(),
                        to: None,
                    }
                    .into())
                }
            };
            let entry = self.engine.transition_entry(&report, target, note)?;

            match self.store.append(id, entry).await {
                Ok(updated) => {
                    info!(
                        report_id = %id,
                        from = %report.status(),
                        to = %updated.status(),
                        attempt,
                        "Report status changed"
                    );
                    return Ok(updated);
                }
                Err(StoreError::ConcurrentModification { expected, found, .. }) => {
                    warn!(
                        report_id = %id,
                        attempt,
                        expected,
                        found,
                        "Concurrent modification, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(TrackerError::RetriesExhausted {
            report_id: id,
            attempts: self.max_retries,
        })
    }

    pub async fn history(&self, id: Uuid) -> Result<Vec<HistoryEntry>> {
        let report = self.get(id).await?;
        Ok(LifecycleEngine::history_of(&report).to_vec())
    }

    /// Timeline projection for the tracker page.
    pub async fn timeline(&self, id: Uuid) -> Result<Vec<TimelineStep>> {
        let report = self.get(id).await?;
        Ok(LifecycleEngine::timeline(&report))
    }

    /// Map clusters over stored reports, optionally for one category.
    ///
    /// Without a radius the configured default is used.
    pub async fn map_clusters(
        &self,
        category: Option<Category>,
        radius: Option<ClusterRadius>,
    ) -> Result<Vec<Cluster>> {
        let reports = match category {
            Some(category) => self.store.fetch_by_category(category).await?,
            None => self.store.fetch_all().await?,
        };
        let radius = radius.unwrap_or_else(|| self.clustering.default_radius());
        let clusters = GeoAggregator::cluster(&reports, radius)?;
        debug!(reports = reports.len(), clusters = clusters.len(), "Map clusters computed");
        Ok(clusters)
    }

    /// Stored reports matching `query`, newest first.
    pub async fn search(&self, query: &ReportQuery) -> Result<Vec<Report>> {
        let reports = match query.category {
            Some(category) => self.store.fetch_by_category(category).await?,
            None => self.store.fetch_all().await?,
        };
        let mut matched: Vec<Report> = reports.into_iter().filter(|r| query.matches(r)).collect();
        matched.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(a.id.cmp(&b.id)));
        Ok(matched)
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary> {
        let reports = self.store.fetch_all().await?;
        Ok(DashboardSummary::from_reports(&reports))
    }

    /// Index every measurement. Failures are reported per reading.
    pub fn ingest(&self, measurements: &[Measurement]) -> Vec<IndexReading> {
        measurements
            .iter()
            .map(|m| {
                let outcome = match self.calculator.compute(&m.pollutant, m.concentration) {
                    Ok(value) => ReadingOutcome::Index {
                        value,
                        band: IndexBand::classify(value),
                    },
                    Err(e) => {
                        debug!(pollutant = %m.pollutant, concentration = m.concentration, error = %e, "Measurement not indexed");
                        ReadingOutcome::Unknown { reason: e.to_string() }
                    }
                };
                IndexReading {
                    pollutant: m.pollutant.clone(),
                    coordinates: m.coordinates,
                    timestamp: m.timestamp,
                    outcome,
                }
            })
            .collect()
    }
}
