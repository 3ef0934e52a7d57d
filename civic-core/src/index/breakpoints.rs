//! Breakpoint tables and piecewise-linear interpolation.

use serde::{Deserialize, Serialize};

use super::IndexError;

/// One band: `[concentration_low, concentration_high] -> [index_low, index_high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub concentration_low: f64,
    pub concentration_high: f64,
    pub index_low: u32,
    pub index_high: u32,
}

impl Breakpoint {
    pub const fn new(
        concentration_low: f64,
        concentration_high: f64,
        index_low: u32,
        index_high: u32,
    ) -> Self {
        Self {
            concentration_low,
            concentration_high,
            index_low,
            index_high,
        }
    }

    /// Closed-interval membership.
    pub fn contains(&self, concentration: f64) -> bool {
        concentration >= self.concentration_low && concentration <= self.concentration_high
    }

    /// Linear interpolation within the band, rounded half away from zero.
    pub fn interpolate(&self, concentration: f64) -> u32 {
        let slope = f64::from(self.index_high.saturating_sub(self.index_low))
            / (self.concentration_high - self.concentration_low);
        let raw = slope * (concentration - self.concentration_low) + f64::from(self.index_low);
        raw.round() as u32
    }
}

/// Ordered, validated set of bands for one pollutant.
///
/// Bands ascend strictly; adjacent bands may touch at a single point but never
/// overlap beyond it. When bands touch, the lower band wins at the shared
/// point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableSpec")]
pub struct BreakpointTable {
    /// Decimal places concentrations are truncated to before lookup
    pub(crate) precision: Option<u32>,
    pub(crate) bands: Vec<Breakpoint>,
}

#[derive(Deserialize)]
struct TableSpec {
    #[serde(default)]
    precision: Option<u32>,
    bands: Vec<Breakpoint>,
}

impl TryFrom<TableSpec> for BreakpointTable {
    type Error = IndexError;

    fn try_from(spec: TableSpec) -> Result<Self, Self::Error> {
        BreakpointTable::new(spec.bands, spec.precision)
    }
}

impl BreakpointTable {
    /// Build and validate a table.
    pub fn new(bands: Vec<Breakpoint>, precision: Option<u32>) -> Result<Self, IndexError> {
        if bands.is_empty() {
            return Err(IndexError::InvalidTable("table has no bands".to_string()));
        }
        if let Some(p) = precision {
            if p > 9 {
                return Err(IndexError::InvalidTable(format!("precision {p} is too large")));
            }
        }

        for (i, band) in bands.iter().enumerate() {
            let finite = band.concentration_low.is_finite() && band.concentration_high.is_finite();
            if !finite || band.concentration_low < 0.0 {
                return Err(IndexError::InvalidTable(format!(
                    "band {i} has an invalid concentration range"
                )));
            }
            if band.concentration_low >= band.concentration_high {
                return Err(IndexError::InvalidTable(format!(
                    "band {i}: concentration_low {} must be below concentration_high {}",
                    band.concentration_low, band.concentration_high
                )));
            }
            if band.index_low > band.index_high {
                return Err(IndexError::InvalidTable(format!(
                    "band {i}: index_low {} exceeds index_high {}",
                    band.index_low, band.index_high
                )));
            }
        }

        for (i, pair) in bands.windows(2).enumerate() {
            let (lower, upper) = (&pair[0], &pair[1]);
            if upper.concentration_low < lower.concentration_high {
                return Err(IndexError::InvalidTable(format!(
                    "band {} overlaps band {}",
                    i + 1,
                    i
                )));
            }
            if upper.index_low < lower.index_high {
                return Err(IndexError::InvalidTable(format!(
                    "band {} index range descends below band {}",
                    i + 1,
                    i
                )));
            }
        }

        Ok(Self { precision, bands })
    }

    pub fn bands(&self) -> &[Breakpoint] {
        &self.bands
    }

    pub fn precision(&self) -> Option<u32> {
        self.precision
    }

    /// Highest concentration the table covers.
    pub fn ceiling(&self) -> f64 {
        self.bands
            .last()
            .map(|b| b.concentration_high)
            .unwrap_or(0.0)
    }

    /// Convert a concentration into an index value.
    ///
    /// Negative or non-finite input is `InvalidInput`. A value no band contains
    /// is `OutOfRange`, never zero.
    pub fn compute_index(&self, concentration: f64) -> Result<u32, IndexError> {
        if !concentration.is_finite() || concentration < 0.0 {
            return Err(IndexError::InvalidInput { concentration });
        }

        let lookup = match self.precision {
            Some(places) => truncate(concentration, places),
            None => concentration,
        };

        self.bands
            .iter()
            .find(|band| band.contains(lookup))
            .map(|band| band.interpolate(lookup))
            .ok_or(IndexError::OutOfRange {
                concentration,
                ceiling: self.ceiling(),
            })
    }
}

/// Truncate toward zero at `places` decimals.
///
/// A scaled value within a few ulps of a whole step is snapped to it, since
/// 2.3 * 10 is 22.999...96. Anything further below a step truncates down.
fn truncate(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    let scaled = value * factor;
    let nearest = scaled.round();
    if (scaled - nearest).abs() <= 8.0 * f64::EPSILON * scaled.abs().max(1.0) {
        nearest / factor
    } else {
        scaled.trunc() / factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn two_band() -> BreakpointTable {
        BreakpointTable::new(
            vec![
                Breakpoint::new(0.0, 12.0, 0, 50),
                Breakpoint::new(12.1, 35.4, 51, 100),
            ],
            None,
        )
        .unwrap()
    }

    fn contiguous() -> BreakpointTable {
        BreakpointTable::new(
            vec![
                Breakpoint::new(0.0, 10.0, 0, 40),
                Breakpoint::new(10.0, 30.0, 40, 100),
                Breakpoint::new(30.0, 80.0, 100, 300),
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_rounding_is_pinned() {
        // 50 / 12 * 10 = 41.67
        assert_eq!(two_band().compute_index(10.0), Ok(42));
        // 41.5 rounds away from zero
        let half = BreakpointTable::new(vec![Breakpoint::new(0.0, 2.0, 0, 83)], None).unwrap();
        assert_eq!(half.compute_index(1.0), Ok(42));
    }

    #[test]
    fn test_band_endpoints() {
        let table = two_band();
        assert_eq!(table.compute_index(0.0), Ok(0));
        assert_eq!(table.compute_index(12.0), Ok(50));
        assert_eq!(table.compute_index(12.1), Ok(51));
        assert_eq!(table.compute_index(35.4), Ok(100));
    }

    #[test]
    fn test_out_of_range_is_not_zero() {
        let table = two_band();
        assert_eq!(
            table.compute_index(35.5),
            Err(IndexError::OutOfRange {
                concentration: 35.5,
                ceiling: 35.4
            })
        );
        // gap between bands without a declared precision
        assert!(matches!(
            table.compute_index(12.05),
            Err(IndexError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_precision_closes_gaps() {
        let mut table = two_band();
        table.precision = Some(1);
        assert_eq!(table.compute_index(12.05), Ok(50));
        assert_eq!(truncate(2.3, 1), 2.3);
    }

    #[test]
    fn test_truncation_never_rounds_up() {
        let mut table = two_band();
        table.precision = Some(1);
        assert_eq!(truncate(12.0999999999, 1), 12.0);
        assert_eq!(table.compute_index(12.0999999999), Ok(50));
        assert_eq!(truncate(35.49999999995, 1), 35.4);
        assert_eq!(table.compute_index(35.49999999995), Ok(100));
        // exact steps survive binary representation
        assert_eq!(truncate(0.3, 1), 0.3);
        assert_eq!(truncate(150.5, 1), 150.5);
    }

    #[test]
    fn test_interpolate_inverted_band_does_not_panic() {
        let band = Breakpoint::new(0.0, 5.0, 10, 0);
        assert_eq!(band.interpolate(2.5), 10);
    }

    #[test]
    fn test_invalid_input() {
        let table = two_band();
        assert_eq!(
            table.compute_index(-1.0),
            Err(IndexError::InvalidInput { concentration: -1.0 })
        );
        assert!(matches!(
            table.compute_index(f64::NAN),
            Err(IndexError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_table_validation() {
        assert!(BreakpointTable::new(vec![], None).is_err());
        assert!(BreakpointTable::new(vec![Breakpoint::new(5.0, 5.0, 0, 10)], None).is_err());
        assert!(BreakpointTable::new(vec![Breakpoint::new(0.0, 5.0, 10, 0)], None).is_err());
        let overlapping = vec![
            Breakpoint::new(0.0, 10.0, 0, 50),
            Breakpoint::new(9.0, 20.0, 51, 100),
        ];
        assert!(BreakpointTable::new(overlapping, None).is_err());
        assert!(BreakpointTable::new(contiguous().bands, None).is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{"precision": 1, "bands": [
            {"concentration_low": 0.0, "concentration_high": 4.4, "index_low": 0, "index_high": 50},
            {"concentration_low": 4.5, "concentration_high": 9.4, "index_low": 51, "index_high": 100}
        ]}"#;
        let table: BreakpointTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.precision(), Some(1));
        assert_eq!(table.bands().len(), 2);

        let broken = r#"{"bands": []}"#;
        assert!(serde_json::from_str::<BreakpointTable>(broken).is_err());
    }

    proptest! {
        #[test]
        fn prop_monotonic_within_band(a in 0.0f64..80.0, b in 0.0f64..80.0) {
            let table = contiguous();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(table.compute_index(lo).unwrap() <= table.compute_index(hi).unwrap());
        }

        #[test]
        fn prop_negative_is_invalid(c in -1.0e6f64..-1.0e-9) {
            prop_assert!(
                matches!(
                    two_band().compute_index(c),
                    Err(IndexError::InvalidInput { .. })
                ),
                "negative concentration accepted"
            );
        }
    }

    #[test]
    fn test_continuous_at_boundaries() {
        let table = contiguous();
        for pair in table.bands().windows(2) {
            let lower_end = pair[0].interpolate(pair[0].concentration_high);
            let upper_start = pair[1].interpolate(pair[1].concentration_low);
            assert_eq!(lower_end, upper_start);
            assert_eq!(table.compute_index(pair[0].concentration_high), Ok(lower_end));
        }
    }
}
