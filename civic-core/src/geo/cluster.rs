//! Spatial clustering of reports for map rendering.
//!
//! Greedy complete-linkage: every member of a cluster is within the threshold
//! of every other member. Each category clusters on its own. The result is a
//! pure function of the input set and radius; input order does not matter.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ClusterRadius, GeoError, GeoPoint};
use crate::types::{Category, Coordinates};

/// A transient group of nearby reports of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub category: Category,
    /// Spherical mean of the member positions
    pub centroid: Coordinates,
    /// Member report ids, sorted
    pub member_ids: Vec<Uuid>,
    pub count: usize,
}

impl Cluster {
    pub fn contains(&self, id: &Uuid) -> bool {
        self.member_ids.binary_search(id).is_ok()
    }

    pub fn is_singleton(&self) -> bool {
        self.count == 1
    }
}

/// Groups geolocated reports into map clusters.
pub struct GeoAggregator;

impl GeoAggregator {
    /// Partition `points` into clusters.
    ///
    /// Clusters come out ordered by category, then by their seed (lowest) id.
    pub fn cluster<P: GeoPoint>(
        points: &[P],
        radius: ClusterRadius,
    ) -> Result<Vec<Cluster>, GeoError> {
        let threshold = radius.to_meters()?;

        let mut seen = HashSet::with_capacity(points.len());
        let mut by_category: BTreeMap<Category, Vec<(Uuid, Coordinates)>> = BTreeMap::new();
        for point in points {
            let (id, coordinates) = (point.id(), point.coordinates());
            if !coordinates.is_valid() {
                return Err(GeoError::InvalidInput { id, coordinates });
            }
            if !seen.insert(id) {
                return Err(GeoError::DuplicateReport(id));
            }
            by_category
                .entry(point.category())
                .or_default()
                .push((id, coordinates));
        }

        let mut clusters = Vec::new();
        for (category, mut members) in by_category {
            members.sort_by_key(|(id, _)| *id);
            clusters.extend(cluster_category(category, &members, threshold));
        }

        tracing::debug!(
            points = points.len(),
            clusters = clusters.len(),
            threshold_m = threshold,
            "Clustered reports"
        );
        Ok(clusters)
    }
}

/// Cluster one category. `points` must be sorted by id.
fn cluster_category(
    category: Category,
    points: &[(Uuid, Coordinates)],
    threshold: f64,
) -> Vec<Cluster> {
    let mut assigned = vec![false; points.len()];
    let mut clusters = Vec::new();

    for seed in 0..points.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let seed_pos = points[seed].1;

        // every index below the seed is already assigned
        let mut candidates: Vec<(f64, usize)> = (seed + 1..points.len())
            .filter(|&j| !assigned[j])
            .map(|j| (seed_pos.distance_m(&points[j].1), j))
            .filter(|(d, _)| *d <= threshold)
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut members = vec![seed];
        for (_, j) in candidates {
            let close_to_all = members
                .iter()
                .all(|&m| points[m].1.distance_m(&points[j].1) <= threshold);
            if close_to_all {
                assigned[j] = true;
                members.push(j);
            }
        }

        let positions: Vec<Coordinates> = members.iter().map(|&m| points[m].1).collect();
        let mut member_ids: Vec<Uuid> = members.iter().map(|&m| points[m].0).collect();
        member_ids.sort();

        clusters.push(Cluster {
            category,
            centroid: centroid(&positions),
            count: member_ids.len(),
            member_ids,
        });
    }

    clusters
}

/// Normalized mean of unit vectors; exact for a single point.
fn centroid(positions: &[Coordinates]) -> Coordinates {
    match positions {
        [] => Coordinates::new(0.0, 0.0),
        [only] => *only,
        [first, ..] => {
            let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
            for p in positions {
                let (lat, lon) = (p.latitude.to_radians(), p.longitude.to_radians());
                x += lat.cos() * lon.cos();
                y += lat.cos() * lon.sin();
                z += lat.sin();
            }
            let n = positions.len() as f64;
            let (x, y, z) = (x / n, y / n, z / n);

            let norm = (x * x + y * y + z * z).sqrt();
            if norm < 1e-12 {
                // antipodal members cancel out
                return *first;
            }
            Coordinates::new(
                z.atan2((x * x + y * y).sqrt()).to_degrees(),
                y.atan2(x).to_degrees(),
            )
        }
    }
}
