//! Dashboard aggregates over a report snapshot.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{Category, Report, ReportStatus};

/// Reports per location, for the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCount {
    pub location: String,
    pub count: usize,
}

/// Read-only dashboard snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_status: BTreeMap<ReportStatus, usize>,
    /// Most reported locations first, ties by name
    pub leaderboard: Vec<LocationCount>,
}

impl DashboardSummary {
    pub fn from_reports<'a, I>(reports: I) -> Self
    where
        I: IntoIterator<Item = &'a Report>,
    {
        let mut summary = Self::default();
        for category in Category::all() {
            summary.by_category.insert(category, 0);
        }
        for status in ReportStatus::all() {
            summary.by_status.insert(status, 0);
        }

        let mut locations: HashMap<String, usize> = HashMap::new();
        for report in reports {
            summary.total += 1;
            *summary.by_category.entry(report.category).or_default() += 1;
            *summary.by_status.entry(report.status()).or_default() += 1;

            let location = report.location.trim();
            if !location.is_empty() {
                *locations.entry(location.to_string()).or_default() += 1;
            }
        }

        let mut leaderboard: Vec<LocationCount> = locations
            .into_iter()
            .map(|(location, count)| LocationCount { location, count })
            .collect();
        leaderboard.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.location.cmp(&b.location)));
        summary.leaderboard = leaderboard;

        summary
    }

    /// Share of reports that reached `Verified`, 0.0 for an empty snapshot.
    pub fn resolution_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let verified = self.by_status.get(&ReportStatus::Verified).copied().unwrap_or(0);
        verified as f64 / self.total as f64
    }
}
