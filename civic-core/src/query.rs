//! Report filtering for the tracker list.

use serde::{Deserialize, Serialize};

use crate::types::{Category, Report, ReportStatus};

/// Filter over reports. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportQuery {
    pub category: Option<Category>,
    pub status: Option<ReportStatus>,
    /// Case-insensitive substring of the title or location
    pub text: Option<String>,
}

impl ReportQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_status(mut self, status: ReportStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn matches(&self, report: &Report) -> bool {
        if self.category.is_some_and(|c| c != report.category) {
            return false;
        }
        if self.status.is_some_and(|s| s != report.status()) {
            return false;
        }
        match self.text.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                report.title.to_lowercase().contains(&needle)
                    || report.location.to_lowercase().contains(&needle)
            }
        }
    }

    /// Matching reports, in input order.
    pub fn apply<'a>(&self, reports: &'a [Report]) -> Vec<&'a Report> {
        reports.iter().filter(|r| self.matches(r)).collect()
    }
}
