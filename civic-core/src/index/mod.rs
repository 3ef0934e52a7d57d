//! Pollutant index calculation.
//!
//! Raw concentrations become standardized index values by piecewise-linear
//! interpolation over a [`BreakpointTable`]. The calculator is pollutant
//! agnostic; tables come from configuration, with the US EPA PM2.5 table
//! built in.

mod breakpoints;
mod tables;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use breakpoints::{Breakpoint, BreakpointTable};
pub use tables::{pm25_epa, PM25};

/// Error types for index calculation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndexError {
    /// Negative or non-finite concentration
    #[error("Invalid concentration: {concentration}")]
    InvalidInput { concentration: f64 },

    /// No band contains the concentration
    #[error("Concentration {concentration} is outside the breakpoint table (ceiling {ceiling})")]
    OutOfRange { concentration: f64, ceiling: f64 },

    /// No table registered for the pollutant
    #[error("Unknown pollutant: {0}")]
    UnknownPollutant(String),

    /// Table failed validation
    #[error("Invalid breakpoint table: {0}")]
    InvalidTable(String),
}

/// Health band for an index value, on the EPA AQI scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBand {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl IndexBand {
    pub fn classify(index: u32) -> Self {
        match index {
            0..=50 => Self::Good,
            51..=100 => Self::Moderate,
            101..=150 => Self::UnhealthyForSensitiveGroups,
            151..=200 => Self::Unhealthy,
            201..=300 => Self::VeryUnhealthy,
            _ => Self::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
        }
    }
}

/// Registry of breakpoint tables keyed by pollutant.
///
/// Keys are normalized: lowercase, with `.` and `-` mapped to `_`, so
/// `PM2.5` and `pm2_5` name the same table.
#[derive(Debug, Clone, Default)]
pub struct IndexCalculator {
    tables: BTreeMap<String, BreakpointTable>,
}

impl IndexCalculator {
    /// Empty calculator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculator with the built-in tables.
    pub fn standard() -> Self {
        Self::new().with_table(PM25, pm25_epa().clone())
    }

    /// Builder: register or replace a table.
    pub fn with_table(mut self, pollutant: &str, table: BreakpointTable) -> Self {
        self.insert(pollutant, table);
        self
    }

    pub fn insert(&mut self, pollutant: &str, table: BreakpointTable) {
        self.tables.insert(normalize(pollutant), table);
    }

    pub fn table(&self, pollutant: &str) -> Option<&BreakpointTable> {
        self.tables.get(&normalize(pollutant))
    }

    /// Registered pollutant keys, sorted.
    pub fn pollutants(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Index for a concentration of the given pollutant.
    pub fn compute(&self, pollutant: &str, concentration: f64) -> Result<u32, IndexError> {
        let table = self
            .table(pollutant)
            .ok_or_else(|| IndexError::UnknownPollutant(pollutant.to_string()))?;
        table.compute_index(concentration)
    }
}

fn normalize(pollutant: &str) -> String {
    pollutant
        .trim()
        .to_ascii_lowercase()
        .replace(['.', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_classification() {
        assert_eq!(IndexBand::classify(0), IndexBand::Good);
        assert_eq!(IndexBand::classify(50), IndexBand::Good);
        assert_eq!(IndexBand::classify(51), IndexBand::Moderate);
        assert_eq!(IndexBand::classify(150), IndexBand::UnhealthyForSensitiveGroups);
        assert_eq!(IndexBand::classify(200), IndexBand::Unhealthy);
        assert_eq!(IndexBand::classify(300), IndexBand::VeryUnhealthy);
        assert_eq!(IndexBand::classify(301), IndexBand::Hazardous);
    }

    #[test]
    fn test_pollutant_keys_normalize() {
        let calc = IndexCalculator::standard();
        assert!(calc.table("PM2.5").is_some());
        assert!(calc.table(" pm2-5 ").is_some());
        assert_eq!(calc.pollutants().collect::<Vec<_>>(), vec!["pm2_5"]);
    }

    #[test]
    fn test_unknown_pollutant() {
        let calc = IndexCalculator::standard();
        assert_eq!(
            calc.compute("ozone", 0.05),
            Err(IndexError::UnknownPollutant("ozone".to_string()))
        );
    }

    #[test]
    fn test_replace_table() {
        let custom = BreakpointTable::new(vec![Breakpoint::new(0.0, 100.0, 0, 100)], None).unwrap();
        let calc = IndexCalculator::standard().with_table("pm2_5", custom);
        assert_eq!(calc.compute("pm2_5", 42.0), Ok(42));
    }
}
