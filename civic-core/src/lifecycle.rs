//! Report lifecycle state machine.
//!
//! Reports move `Pending -> InProgress -> Verified`, one level at a time, with
//! a timestamped history entry per step. The engine never owns storage: it
//! takes a report value and returns a new one (or the entry a store should
//! append).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{HistoryEntry, Report, ReportDraft, ReportStatus};

/// Default note for the first history entry.
pub const DEFAULT_SUBMITTED_NOTE: &str = "Report submitted";

/// A single invalid or missing field in a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Error types for lifecycle operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LifecycleError {
    /// Draft failed validation; every offending field is listed
    #[error("Validation failed: {}", describe_fields(.0))]
    Validation(Vec<FieldError>),

    /// Transition not allowed from the current status
    #[error("Invalid transition for report {report_id}: {from} -> {}", describe_target(.to))]
    InvalidTransition {
        report_id: Uuid,
        from: ReportStatus,
        to: Option<ReportStatus>,
    },

    /// Report violates the history/progress invariants
    #[error("Inconsistent report {report_id}: {reason}")]
    Inconsistent { report_id: Uuid, reason: String },
}

fn describe_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{} ({})", f.field, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_target(to: &Option<ReportStatus>) -> String {
    match to {
        Some(status) => status.to_string(),
        None => "<none>".to_string(),
    }
}

/// Source of "now" for history timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for deterministic timestamps.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// One step of the tracker timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineStep {
    pub status: ReportStatus,
    pub title: String,
    pub description: String,
    /// Whether the report has reached this step
    pub reached: bool,
    /// When it was reached
    pub reached_at: Option<DateTime<Utc>>,
    /// Note recorded with the step
    pub note: Option<String>,
}

/// Owns the report status state machine.
pub struct LifecycleEngine<C: Clock = SystemClock> {
    clock: C,
    submitted_note: String,
}

impl LifecycleEngine<SystemClock> {
    /// Engine on the wall clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Check a draft, collecting every problem rather than stopping at the first.
    pub fn validate(draft: &ReportDraft) -> Result<(), LifecycleError> {
        let mut errors = Vec::new();

        if draft.title.trim().is_empty() {
            errors.push(FieldError::new("title", "must not be empty"));
        }

        let c = draft.coordinates;
        if !c.latitude.is_finite() || !(-90.0..=90.0).contains(&c.latitude) {
            errors.push(FieldError::new(
                "coordinates.latitude",
                format!("{} is not within [-90, 90]", c.latitude),
            ));
        }
        if !c.longitude.is_finite() || !(-180.0..=180.0).contains(&c.longitude) {
            errors.push(FieldError::new(
                "coordinates.longitude",
                format!("{} is not within [-180, 180]", c.longitude),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::Validation(errors))
        }
    }

    /// Read-only view of a report's history.
    pub fn history_of(report: &Report) -> &[HistoryEntry] {
        report.history()
    }

    /// Tracker timeline: every lifecycle step, with when it was reached.
    pub fn timeline(report: &Report) -> Vec<TimelineStep> {
        ReportStatus::all()
            .into_iter()
            .map(|status| {
                let entry = report
                    .history()
                    .iter()
                    .find(|e| e.progress() == status.progress());
                TimelineStep {
                    status,
                    title: status.step_title().to_string(),
                    description: status.step_description().to_string(),
                    reached: report.progress() >= status.progress(),
                    reached_at: entry.map(|e| e.date),
                    note: entry.map(|e| e.update.clone()),
                }
            })
            .collect()
    }
}

impl Default for LifecycleEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LifecycleEngine<C> {
    /// Engine on a custom clock.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            submitted_note: DEFAULT_SUBMITTED_NOTE.to_string(),
        }
    }

    /// Builder: set the note of the submission entry.
    pub fn with_submitted_note(mut self, note: impl Into<String>) -> Self {
        self.submitted_note = note.into();
        self
    }

    /// Create a report in `Pending` with its submission entry.
    pub fn create(&self, draft: ReportDraft) -> Result<Report, LifecycleError> {
        LifecycleEngine::<SystemClock>::validate(&draft)?;
        let report = Report::submitted(draft, self.clock.now(), self.submitted_note.clone());
        tracing::debug!(report_id = %report.id, category = %report.category, "Report created");
        Ok(report)
    }

    /// Build the entry that moves `report` to `target`.
    ///
    /// `target` must be exactly the next status; anything else (a skip, a
    /// repeat, a regression, or any move out of `Verified`) is rejected.
    pub fn transition_entry(
        &self,
        report: &Report,
        target: ReportStatus,
        note: impl Into<String>,
    ) -> Result<HistoryEntry, LifecycleError> {
        report.check_consistency()?;

        if report.status().next() != Some(target) {
            return Err(LifecycleError::InvalidTransition {
                report_id: report.id,
                from: report.status(),
                to: Some(target),
            });
        }
        Ok(HistoryEntry::new(target.progress(), self.clock.now(), note))
    }

    /// Move a report one level forward.
    pub fn advance(&self, report: &Report, note: impl Into<String>) -> Result<Report, LifecycleError> {
        let Some(target) = report.status().next() else {
            return Err(LifecycleError::InvalidTransition {
                report_id: report.id,
                from: report.status(),
                to: None,
            });
        };
        self.advance_to(report, target, note)
    }

    /// Move a report to an explicit target, which must be the next status.
    pub fn advance_to(
        &self,
        report: &Report,
        target: ReportStatus,
        note: impl Into<String>,
    ) -> Result<Report, LifecycleError> {
        let entry = self.transition_entry(report, target, note)?;
        let mut next = report.clone();
        next.apply(entry)?;
        tracing::debug!(
            report_id = %next.id,
            status = %next.status(),
            progress = next.progress(),
            "Report advanced"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Coordinates};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn engine() -> LifecycleEngine<FixedClock> {
        LifecycleEngine::with_clock(FixedClock(
            Utc.with_ymd_and_hms(2025, 1, 14, 10, 30, 0).unwrap(),
        ))
    }

    fn draft() -> ReportDraft {
        ReportDraft::new(
            Category::Waste,
            "Plastic Waste on Road",
            Coordinates::new(19.0760, 72.8777),
        )
        .with_location("Mumbai")
        .with_description("Plastic bottles blocking roadside drainage")
    }

    #[test]
    fn test_create_initial_state() {
        let report = engine().create(draft()).unwrap();
        assert_eq!(report.progress(), 1);
        assert_eq!(report.status(), ReportStatus::Pending);
        assert_eq!(report.history().len(), 1);
        assert_eq!(report.history()[0].update, DEFAULT_SUBMITTED_NOTE);
        assert_eq!(report.history()[0].date, report.submitted_at);
    }

    #[test]
    fn test_create_lists_every_invalid_field() {
        let mut bad = draft();
        bad.title = "   ".to_string();
        bad.coordinates = Coordinates::new(120.0, f64::INFINITY);

        match engine().create(bad) {
            Err(LifecycleError::Validation(fields)) => {
                let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(
                    names,
                    vec!["title", "coordinates.latitude", "coordinates.longitude"]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_full_lifecycle() {
        let engine = engine();
        let report = engine.create(draft()).unwrap();

        let report = engine.advance(&report, "Municipal team dispatched").unwrap();
        assert_eq!(report.progress(), 2);
        assert_eq!(report.status(), ReportStatus::InProgress);
        assert_eq!(report.history().len(), 2);

        let report = engine.advance(&report, "Cleanup completed").unwrap();
        assert_eq!(report.status(), ReportStatus::Verified);
        assert_eq!(report.history().len(), 3);

        let err = engine.advance(&report, "Again").unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                report_id: report.id,
                from: ReportStatus::Verified,
                to: None,
            }
        );
    }

    #[test]
    fn test_advance_to_rejects_skip_and_repeat() {
        let engine = engine();
        let report = engine.create(draft()).unwrap();

        assert!(matches!(
            engine.advance_to(&report, ReportStatus::Verified, "skip"),
            Err(LifecycleError::InvalidTransition { .. })
        ));
        assert!(matches!(
            engine.advance_to(&report, ReportStatus::Pending, "repeat"),
            Err(LifecycleError::InvalidTransition { .. })
        ));

        let advanced = engine
            .advance_to(&report, ReportStatus::InProgress, "Assigned")
            .unwrap();
        assert!(matches!(
            engine.advance_to(&advanced, ReportStatus::Pending, "regress"),
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_advance_does_not_mutate_input() {
        let engine = engine();
        let report = engine.create(draft()).unwrap();
        let _ = engine.advance(&report, "Assigned").unwrap();
        assert_eq!(report.progress(), 1);
        assert_eq!(LifecycleEngine::history_of(&report).len(), 1);
    }

    #[test]
    fn test_timeline_projection() {
        let engine = engine();
        let report = engine.create(draft()).unwrap();
        let report = engine.advance(&report, "Cleanup in progress").unwrap();

        let steps = LifecycleEngine::timeline(&report);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].title, "Reported");
        assert!(steps[0].reached && steps[1].reached && !steps[2].reached);
        assert_eq!(steps[1].note.as_deref(), Some("Cleanup in progress"));
        assert_eq!(steps[2].reached_at, None);
    }

    #[test]
    fn test_error_messages() {
        let err = LifecycleError::InvalidTransition {
            report_id: Uuid::nil(),
            from: ReportStatus::Pending,
            to: Some(ReportStatus::Verified),
        };
        assert!(err.to_string().ends_with("Pending -> Verified"));
    }

    proptest! {
        #[test]
        fn prop_progress_is_monotonic(steps in proptest::collection::vec(0u8..5, 0..12)) {
            let engine = engine();
            let mut report = engine.create(draft()).unwrap();

            for step in steps {
                let before = report.progress();
                // steps without a status mean a plain advance
                let result = match ReportStatus::from_progress(step) {
                    Some(target) => engine.advance_to(&report, target, "step"),
                    _ => engine.advance(&report, "step"),
                };
                match result {
                    Ok(next) => {
                        prop_assert_eq!(next.progress(), before + 1);
                        report = next;
                    }
                    Err(LifecycleError::InvalidTransition { .. }) => {}
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
                prop_assert!((1..=3).contains(&report.progress()));
                prop_assert!(report.history().len() >= report.progress() as usize);
                prop_assert_eq!(
                    report.history().last().and_then(|e| e.status()),
                    Some(report.status())
                );
            }
        }
    }
}
