//! Built-in breakpoint tables.

use std::sync::OnceLock;

use super::breakpoints::{Breakpoint, BreakpointTable};

/// Registry key for fine particulate matter.
pub const PM25: &str = "pm2_5";

const PM25_BANDS: [Breakpoint; 7] = [
    Breakpoint::new(0.0, 12.0, 0, 50),
    Breakpoint::new(12.1, 35.4, 51, 100),
    Breakpoint::new(35.5, 55.4, 101, 150),
    Breakpoint::new(55.5, 150.4, 151, 200),
    Breakpoint::new(150.5, 250.4, 201, 300),
    Breakpoint::new(250.5, 350.4, 301, 400),
    Breakpoint::new(350.5, 500.4, 401, 500),
];

/// US EPA PM2.5 AQI table (µg/m³, 24-hour), truncated to one decimal.
pub fn pm25_epa() -> &'static BreakpointTable {
    static TABLE: OnceLock<BreakpointTable> = OnceLock::new();
    TABLE.get_or_init(|| BreakpointTable {
        precision: Some(1),
        bands: PM25_BANDS.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexError;

    #[test]
    fn test_pm25_table_is_valid() {
        let table = pm25_epa();
        let rebuilt = BreakpointTable::new(table.bands().to_vec(), table.precision()).unwrap();
        assert_eq!(&rebuilt, table);
    }

    #[test]
    fn test_pm25_values() {
        let table = pm25_epa();
        assert_eq!(table.compute_index(10.0), Ok(42));
        assert_eq!(table.compute_index(12.05), Ok(50));
        assert_eq!(table.compute_index(35.5), Ok(101));
        assert_eq!(table.compute_index(55.4), Ok(150));
        assert_eq!(table.compute_index(500.4), Ok(500));
        assert!(matches!(
            table.compute_index(500.5),
            Err(IndexError::OutOfRange { .. })
        ));
    }
}
