//! Spatial index over stops.
//!
//! Grounded on the teacher's
//! `csa/stop_collection.rs::StopCollection` (a `kiddo` kd-tree over
//! unit-sphere coordinates with a chord-length <-> metres conversion),
//! generalised to expose both `nearest` and `within_radius` — the teacher
//! only needed the latter.

use std::collections::HashMap;
use std::ops::Index;

use kiddo::{SquaredEuclidean, float::kdtree::KdTree};

use crate::model::{Stop, StopId};
use crate::provider::StopRow;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Degrees-per-metre used for the kd-tree's conservative angular radius
/// query: callers re-filter by haversine distance to
/// enforce the exact metric bound, so small false positives here are
/// harmless and false negatives are what must be avoided.
const DEGREES_PER_METRE: f64 = 1.0 / 111_320.0;

pub struct StopIndex {
    tree: KdTree<f64, u32, 3, 32, u32>,
    stops: HashMap<StopId, Stop>,
}

impl Index<StopId> for StopIndex {
    type Output = Stop;

    fn index(&self, id: StopId) -> &Self::Output {
        &self.stops[&id]
    }
}

impl StopIndex {
    /// Builds the index from provider rows, assigning a dense [`StopId`] to
    /// each stop in input order. Stops with a non-finite position are
    /// silently excluded, per `spec.md` §3's Stop invariant and §7's "a
    /// missing-position stop is silently skipped at index build time".
    pub fn build(rows: Vec<StopRow>) -> Self {
        let mut tree: KdTree<f64, u32, 3, 32, u32> = KdTree::new();
        let mut stops = HashMap::new();

        let mut next_id = 0u32;
        for row in rows {
            if !row.lat.is_finite() || !row.lon.is_finite() {
                continue;
            }
            let id = StopId::new(next_id);
            next_id += 1;

            tree.add(&to_unit(row.lat, row.lon), id.index() as u32);
            stops.insert(id, Stop::new(id, row.stop_id, row.name, row.lat, row.lon));
        }

        Self { tree, stops }
    }

    pub fn get(&self, id: StopId) -> Option<&Stop> {
        self.stops.get(&id)
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stop> {
        self.stops.values()
    }

    /// The single nearest stop to `(lat, lon)`, if the index is non-empty.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<StopId> {
        if self.stops.is_empty() {
            return None;
        }
        let nearest = self.tree.nearest_one::<SquaredEuclidean>(&to_unit(lat, lon));
        Some(StopId::new(nearest.item))
    }

    /// Every stop whose great-circle distance from `(lat, lon)` is at most
    /// `radius_m`. Must have no false negatives; the conservative angular
    /// query this is built on can produce a few false positives, which are
    /// filtered out by re-checking the exact haversine distance.
    pub fn within_radius(&self, lat: f64, lon: f64, radius_m: f64) -> Vec<(StopId, f64)> {
        let angular_radius_deg = radius_m * DEGREES_PER_METRE;
        let chord2 = degrees_to_chord2(angular_radius_deg);

        self.tree
            .within::<SquaredEuclidean>(&to_unit(lat, lon), chord2)
            .into_iter()
            .filter_map(|candidate| {
                let id = StopId::new(candidate.item);
                let stop = self.stops.get(&id)?;
                let distance = crate::geo::haversine(lat, lon, stop.lat, stop.lon);
                (distance <= radius_m).then_some((id, distance))
            })
            .collect()
    }
}

fn to_unit(lat_deg: f64, lon_deg: f64) -> [f64; 3] {
    let (lat, lon) = (lat_deg.to_radians(), lon_deg.to_radians());
    let (clat, clon, slat, slon) = (lat.cos(), lon.cos(), lat.sin(), lon.sin());
    [clat * clon, clat * slon, slat]
}

fn degrees_to_chord2(degrees: f64) -> f64 {
    let half_chord_angle = degrees.to_radians() / 2.0;
    4.0 * half_chord_angle.sin().powi(2)
}
