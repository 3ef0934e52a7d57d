//! Core types for civic issue reports.
//!
//! A [`Report`] carries its identity fields publicly; the lifecycle fields
//! (`status`, `progress`, `history`) are only changed through
//! [`Report::apply`], which is what the lifecycle engine and stores call.
//!
//! With the `typescript` feature enabled, these types can be exported to
//! TypeScript using ts-rs for the map and tracker frontends.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::lifecycle::LifecycleError;

/// Issue category. Reports never cluster across categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum Category {
    /// Garbage, dumping, overflowing bins
    Waste,
    /// Contamination, leakage, discoloration
    Water,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waste => "Waste",
            Self::Water => "Water",
        }
    }

    /// All categories in clustering order.
    pub fn all() -> [Self; 2] {
        [Self::Waste, Self::Water]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "waste" => Ok(Self::Waste),
            "water" => Ok(Self::Water),
            other => Err(ParseCategoryError(other.to_string())),
        }
    }
}

/// Report status, a direct encoding of progress.
///
/// `Pending (1) -> InProgress (2) -> Verified (3)`; `Verified` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum ReportStatus {
    Pending = 1,
    #[serde(rename = "In Progress")]
    InProgress = 2,
    Verified = 3,
}

impl ReportStatus {
    /// Lowest progress value.
    pub const MIN_PROGRESS: u8 = 1;
    /// Highest progress value, reached at `Verified`.
    pub const MAX_PROGRESS: u8 = 3;

    pub fn progress(&self) -> u8 {
        *self as u8
    }

    pub fn from_progress(progress: u8) -> Option<Self> {
        match progress {
            1 => Some(Self::Pending),
            2 => Some(Self::InProgress),
            3 => Some(Self::Verified),
            _ => None,
        }
    }

    /// The status an advance leads to, `None` when terminal.
    pub fn next(&self) -> Option<Self> {
        Self::from_progress(self.progress() + 1)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Verified => "Verified",
        }
    }

    /// Tracker step title.
    pub fn step_title(&self) -> &'static str {
        match self {
            Self::Pending => "Reported",
            Self::InProgress => "In Progress",
            Self::Verified => "Verified",
        }
    }

    /// Tracker step description.
    pub fn step_description(&self) -> &'static str {
        match self {
            Self::Pending => "Your issue has been reported.",
            Self::InProgress => "Our team is working on it.",
            Self::Verified => "Issue resolved and verified.",
        }
    }

    /// All statuses in lifecycle order.
    pub fn all() -> [Self; 3] {
        [Self::Pending, Self::InProgress, Self::Verified]
    }
}

impl Default for ReportStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "inprogress" => Ok(Self::InProgress),
            "verified" => Ok(Self::Verified),
            _ => Err(format!("Unknown status: {s}")),
        }
    }
}

/// WGS84 position. Serialized as `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Finite, latitude in [-90, 90], longitude in [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<(f64, f64)> for Coordinates {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self { latitude, longitude }
    }
}

impl From<Coordinates> for (f64, f64) {
    fn from(c: Coordinates) -> Self {
        (c.latitude, c.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// One timestamped step in a report's history.
///
/// `progress` is the level this entry moved the report to. It is not part of
/// the wire form; deserialization restores it from the entry's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct HistoryEntry {
    /// When the step happened
    pub date: DateTime<Utc>,
    /// Status note shown on the tracker
    pub update: String,
    #[serde(skip)]
    progress: u8,
}

impl HistoryEntry {
    pub fn new(progress: u8, date: DateTime<Utc>, update: impl Into<String>) -> Self {
        Self {
            date,
            update: update.into(),
            progress,
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Status this entry corresponds to.
    pub fn status(&self) -> Option<ReportStatus> {
        ReportStatus::from_progress(self.progress)
    }
}

/// Submitter input, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ReportDraft {
    pub category: Category,
    pub title: String,
    pub description: String,
    pub location: String,
    #[cfg_attr(feature = "typescript", ts(type = "[number, number]"))]
    pub coordinates: Coordinates,
}

impl ReportDraft {
    pub fn new(
        category: Category,
        title: impl Into<String>,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            category,
            title: title.into(),
            description: String::new(),
            location: String::new(),
            coordinates,
        }
    }

    /// Builder: set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set location text.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
}

/// A citizen report, owned by the report store.
///
/// Field order matches the persisted form:
/// `{id, category, title, description, location, coordinates, submittedAt,
/// status, progress, history}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase", try_from = "ReportRecord")]
pub struct Report {
    pub id: Uuid,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub location: String,
    #[cfg_attr(feature = "typescript", ts(type = "[number, number]"))]
    pub coordinates: Coordinates,
    pub submitted_at: DateTime<Utc>,
    status: ReportStatus,
    progress: u8,
    history: Vec<HistoryEntry>,
}

impl Report {
    /// A freshly submitted report. Inputs are assumed validated.
    pub(crate) fn submitted(
        draft: ReportDraft,
        submitted_at: DateTime<Utc>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: draft.category,
            title: draft.title.trim().to_string(),
            description: draft.description,
            location: draft.location,
            coordinates: draft.coordinates,
            submitted_at,
            status: ReportStatus::Pending,
            progress: ReportStatus::MIN_PROGRESS,
            history: vec![HistoryEntry::new(
                ReportStatus::MIN_PROGRESS,
                submitted_at,
                note,
            )],
        }
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn is_verified(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append a history entry, moving the report exactly one level forward.
    ///
    /// This is the only way the lifecycle fields change.
    pub fn apply(&mut self, entry: HistoryEntry) -> Result<(), LifecycleError> {
        self.check_consistency()?;

        let target = ReportStatus::from_progress(entry.progress);
        if self.status.is_terminal() || entry.progress != self.progress + 1 {
            return Err(LifecycleError::InvalidTransition {
                report_id: self.id,
                from: self.status,
                to: target,
            });
        }
        // next() is Some for every non-terminal status
        let Some(next) = target else {
            return Err(LifecycleError::InvalidTransition {
                report_id: self.id,
                from: self.status,
                to: None,
            });
        };

        self.history.push(entry);
        self.progress = next.progress();
        self.status = next;
        Ok(())
    }

    /// Verify the lifecycle invariants.
    pub fn check_consistency(&self) -> Result<(), LifecycleError> {
        let inconsistent = |reason: String| LifecycleError::Inconsistent {
            report_id: self.id,
            reason,
        };

        let Some(expected) = ReportStatus::from_progress(self.progress) else {
            return Err(inconsistent(format!("progress {} out of range", self.progress)));
        };
        if expected != self.status {
            return Err(inconsistent(format!(
                "status {} does not match progress {}",
                self.status, self.progress
            )));
        }
        if self.history.len() < self.progress as usize {
            return Err(inconsistent(format!(
                "history has {} entries for progress {}",
                self.history.len(),
                self.progress
            )));
        }
        for (i, entry) in self.history.iter().enumerate() {
            if entry.progress as usize != i + 1 {
                return Err(inconsistent(format!(
                    "history entry {} carries progress {}",
                    i, entry.progress
                )));
            }
        }
        if let Some(first) = self.history.first() {
            if first.date != self.submitted_at {
                return Err(inconsistent(format!(
                    "first history entry dated {} but submitted at {}",
                    first.date, self.submitted_at
                )));
            }
        }
        match self.history.last().and_then(HistoryEntry::status) {
            Some(last) if last == self.status => Ok(()),
            _ => Err(inconsistent("last history entry does not match status".to_string())),
        }
    }
}

/// Wire form of a report, validated into [`Report`] on deserialization.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRecord {
    id: Uuid,
    category: Category,
    title: String,
    description: String,
    location: String,
    coordinates: Coordinates,
    submitted_at: DateTime<Utc>,
    status: ReportStatus,
    progress: u8,
    history: Vec<HistoryEntry>,
}

impl TryFrom<ReportRecord> for Report {
    type Error = LifecycleError;

    fn try_from(record: ReportRecord) -> Result<Self, Self::Error> {
        let history = record
            .history
            .into_iter()
            .enumerate()
            .map(|(i, entry)| HistoryEntry {
                progress: u8::try_from(i + 1).unwrap_or(u8::MAX),
                ..entry
            })
            .collect();

        let report = Report {
            id: record.id,
            category: record.category,
            title: record.title,
            description: record.description,
            location: record.location,
            coordinates: record.coordinates,
            submitted_at: record.submitted_at,
            status: record.status,
            progress: record.progress,
            history,
        };
        report.check_consistency()?;
        Ok(report)
    }
}

/// A raw sensor reading from the measurement source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Measurement {
    /// Pollutant key, e.g. `pm2_5`
    pub pollutant: String,
    /// Measured concentration
    pub concentration: f64,
    #[cfg_attr(feature = "typescript", ts(type = "[number, number]"))]
    pub coordinates: Coordinates,
    pub timestamp: DateTime<Utc>,
}
