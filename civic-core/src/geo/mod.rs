//! Geospatial helpers and report clustering.

mod cluster;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Category, Coordinates, Report};

pub use cluster::{Cluster, GeoAggregator};

/// Mean Earth radius (IUGG), metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Web-Mercator ground resolution at zoom 0 on the equator, metres per
/// pixel for 256 px tiles.
pub const METERS_PER_PIXEL_Z0: f64 = 156_543.033_92;

/// Mercator projections are undefined past this latitude.
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_78;

/// Error types for geospatial operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// Point has non-finite or out-of-range coordinates
    #[error("Invalid coordinates for {id}: {coordinates}")]
    InvalidInput { id: Uuid, coordinates: Coordinates },

    /// Radius cannot be turned into a positive distance
    #[error("Invalid cluster radius: {0}")]
    InvalidRadius(String),

    /// The same id appears twice in the input
    #[error("Duplicate report in cluster input: {0}")]
    DuplicateReport(Uuid),
}

/// Proximity threshold for clustering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterRadius {
    /// Ground distance
    Meters(f64),
    /// Screen distance at a zoom level, measured at a reference latitude
    Pixels {
        pixels: f64,
        zoom: u8,
        reference_latitude: f64,
    },
}

impl ClusterRadius {
    /// Threshold in metres.
    pub fn to_meters(&self) -> Result<f64, GeoError> {
        match *self {
            Self::Meters(m) => {
                if m.is_finite() && m > 0.0 {
                    Ok(m)
                } else {
                    Err(GeoError::InvalidRadius(format!("{m} m")))
                }
            }
            Self::Pixels {
                pixels,
                zoom,
                reference_latitude,
            } => {
                if !pixels.is_finite() || pixels <= 0.0 {
                    return Err(GeoError::InvalidRadius(format!("{pixels} px")));
                }
                if zoom > 24 {
                    return Err(GeoError::InvalidRadius(format!("zoom {zoom}")));
                }
                if !reference_latitude.is_finite()
                    || reference_latitude.abs() > MAX_MERCATOR_LATITUDE
                {
                    return Err(GeoError::InvalidRadius(format!(
                        "reference latitude {reference_latitude}"
                    )));
                }
                Ok(pixels * meters_per_pixel(zoom, reference_latitude))
            }
        }
    }
}

/// Ground resolution of a Web-Mercator map.
pub fn meters_per_pixel(zoom: u8, latitude: f64) -> f64 {
    METERS_PER_PIXEL_Z0 * latitude.to_radians().cos() / 2f64.powi(i32::from(zoom))
}

impl Coordinates {
    /// Great-circle distance (haversine), metres.
    pub fn distance_m(&self, other: &Coordinates) -> f64 {
        let (phi1, phi2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_phi = phi2 - phi1;
        let d_lambda = (other.longitude - self.longitude).to_radians();

        let h = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * h.min(1.0).sqrt().asin()
    }
}

/// Anything that can be placed on the map.
pub trait GeoPoint {
    fn id(&self) -> Uuid;
    fn category(&self) -> Category;
    fn coordinates(&self) -> Coordinates;
}

impl GeoPoint for Report {
    fn id(&self) -> Uuid {
        self.id
    }

    fn category(&self) -> Category {
        self.category
    }

    fn coordinates(&self) -> Coordinates {
        self.coordinates
    }
}

impl<T: GeoPoint> GeoPoint for &T {
    fn id(&self) -> Uuid {
        (**self).id()
    }

    fn category(&self) -> Category {
        (**self).category()
    }

    fn coordinates(&self) -> Coordinates {
        (**self).coordinates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // 0.0022 degrees of longitude at Delhi latitude
        let a = Coordinates::new(28.6129, 77.2273);
        let b = Coordinates::new(28.6129, 77.2295);
        let d = a.distance_m(&b);
        assert!((d - 214.7).abs() < 1.0, "{d}");
        assert_eq!(a.distance_m(&a), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Coordinates::new(-33.8688, 151.2093);
        let b = Coordinates::new(51.5074, -0.1278);
        assert!((a.distance_m(&b) - b.distance_m(&a)).abs() < 1e-6);
        assert!((a.distance_m(&b) / 1000.0 - 16_994.0).abs() < 20.0);
    }

    #[test]
    fn test_pixel_radius() {
        let r = ClusterRadius::Pixels {
            pixels: 80.0,
            zoom: 13,
            reference_latitude: 0.0,
        };
        let m = r.to_meters().unwrap();
        assert!((m - 80.0 * 19.109).abs() < 1.0, "{m}");

        let north = ClusterRadius::Pixels {
            pixels: 80.0,
            zoom: 13,
            reference_latitude: 60.0,
        };
        assert!((north.to_meters().unwrap() - m / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_radius() {
        assert!(ClusterRadius::Meters(0.0).to_meters().is_err());
        assert!(ClusterRadius::Meters(f64::NAN).to_meters().is_err());
        assert!(ClusterRadius::Pixels {
            pixels: 80.0,
            zoom: 30,
            reference_latitude: 0.0
        }
        .to_meters()
        .is_err());
        assert!(ClusterRadius::Pixels {
            pixels: 80.0,
            zoom: 10,
            reference_latitude: 89.0
        }
        .to_meters()
        .is_err());
    }
}
