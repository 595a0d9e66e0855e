//! Isochrone synthesiser.
//!
//! Turns the engine's per-stop arrival labels into the reachable-area
//! polygon. Grounded on
//! `examples/original_source/mobilidade/transporte/algorithms/calcular_raio_csa.py`'s
//! buffer / `unary_union` / reproject pipeline, expressed with the `geo`
//! crate's `BooleanOps::union` and `MapCoords` algorithms the way
//! `NREL-bambam/rust/bambam-osm/src/algorithm/consolidation/consolidation_ops.rs`
//! (buffering + union) and `bambam-omf/src/collection/record/common.rs`
//! (`map_coords` reprojection) use them — the teacher carries no geometric
//! union code of its own, so this module is the pack-enrichment the spec
//! needs beyond the teacher.

use std::f64::consts::PI;

use geo::{BooleanOps, Coord, LineString, MapCoords, MultiPolygon, Polygon};

use crate::config::EngineConstants;
use crate::geo::{to_geographic, to_planar};
use crate::model::StopId;
use crate::stops::StopIndex;

/// Number of vertices used to approximate each residual-walk disk; per
/// `spec.md` §4.E's "default circular approximation quality".
const CIRCLE_SEGMENTS: usize = 48;

/// One reached stop's residual-walk contribution, carried alongside the
/// synthesised region for [`crate::assembler`].
#[derive(Clone, Debug, PartialEq)]
pub struct ReachedStop {
    /// The provider's opaque `stop_id`, carried through to output features.
    pub stop_id: String,
    pub stop_name: String,
    pub lat: f64,
    pub lon: f64,
    /// Minutes elapsed between departure and arrival at this stop.
    pub delta_minutes: f64,
}

/// The synthesised isochrone: the unioned, reprojected reachable region
/// (possibly more than one disconnected polygon) plus the per-stop points
/// that produced it.
#[derive(Clone, Debug, Default)]
pub struct Isochrone {
    pub region: MultiPolygon<f64>,
    pub reached_stops: Vec<ReachedStop>,
}

/// Builds the isochrone region from the engine's arrival labels, per
/// `spec.md` §4.E.
pub fn synthesize(
    stops: &StopIndex,
    arrivals: &std::collections::HashMap<StopId, f64>,
    departure_minute: f64,
    budget_minutes: f64,
    constants: &EngineConstants,
) -> Isochrone {
    let mut reached_stops = Vec::with_capacity(arrivals.len());
    let mut disks: Vec<Polygon<f64>> = Vec::with_capacity(arrivals.len());

    for (&stop_id, &arrival) in arrivals {
        let delta = arrival - departure_minute;
        if delta > budget_minutes {
            continue;
        }
        let Some(stop) = stops.get(stop_id) else {
            continue;
        };

        let residual_minutes = budget_minutes - delta;
        let radius_m =
            (residual_minutes * constants.v_walk_kmh * 1000.0 / 60.0).max(constants.rho_min_m);

        let (cx, cy) = to_planar(stop.lat, stop.lon);
        disks.push(circle_polygon(cx, cy, radius_m));

        reached_stops.push(ReachedStop {
            stop_id: stop.external_id.clone(),
            stop_name: stop.name.clone(),
            lat: stop.lat,
            lon: stop.lon,
            delta_minutes: delta,
        });
    }

    let region_planar = union_all(disks);
    let region = region_planar.map_coords(|Coord { x, y }| {
        let (lat, lon) = to_geographic(x, y);
        Coord { x: lon, y: lat }
    });

    Isochrone { region, reached_stops }
}

fn circle_polygon(center_x: f64, center_y: f64, radius_m: f64) -> Polygon<f64> {
    let mut coords: Vec<Coord<f64>> = (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let theta = 2.0 * PI * (i as f64) / (CIRCLE_SEGMENTS as f64);
            Coord {
                x: center_x + radius_m * theta.cos(),
                y: center_y + radius_m * theta.sin(),
            }
        })
        .collect();
    coords.push(coords[0]);
    Polygon::new(LineString::new(coords), vec![])
}

fn union_all(disks: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    disks
        .into_iter()
        .fold(MultiPolygon::new(vec![]), |acc, polygon| {
            acc.union(&MultiPolygon::new(vec![polygon]))
        })
}
