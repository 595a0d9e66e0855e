//! Result assembler.
//!
//! Turns an [`crate::isochrone::Isochrone`] into the GeoJSON
//! `FeatureCollection` the caller sees, grounded directly on
//! `examples/original_source/mobilidade/transporte/algorithms/calcular_raio_csa.py`'s
//! `"tipo": "isocrona"` / `"tempo_min"` feature properties, expressed with
//! the teacher's `geojson::ser::to_feature` + `serialize_geometry` pattern
//! (`csa.rs::ArrivalTime`/`to_feature_collection`) rather than building
//! `Feature` structs by hand.

use geojson::{Feature, FeatureCollection, ser::serialize_geometry};
use serde::Serialize;

use crate::isochrone::Isochrone;

#[derive(Serialize)]
struct RegionFeature {
    tipo: &'static str,
    tempo_min: f64,
    #[serde(serialize_with = "serialize_geometry")]
    geometry: geo_types::Polygon<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
struct ReachedStopFeature {
    stop_id: String,
    stop_name: String,
    tempo_min: f64,
    #[serde(serialize_with = "serialize_geometry")]
    geometry: geo_types::Point<f64>,
}

/// Builds the `FeatureCollection`: one
/// Polygon feature per connected region, one Point feature per reached
/// stop. An isochrone with no reached stops yields a `FeatureCollection`
/// with an empty `features` array rather than an error.
pub fn assemble(isochrone: &Isochrone, budget_minutes: f64) -> Result<FeatureCollection, geojson::Error> {
    let mut features = Vec::with_capacity(isochrone.region.0.len() + isochrone.reached_stops.len());

    for polygon in &isochrone.region {
        features.push(geojson::ser::to_feature(&RegionFeature {
            tipo: "isocrona",
            tempo_min: budget_minutes,
            geometry: polygon.clone(),
        })?);
    }

    for stop in &isochrone.reached_stops {
        features.push(geojson::ser::to_feature(&ReachedStopFeature {
            stop_id: stop.stop_id.clone(),
            stop_name: stop.stop_name.clone(),
            tempo_min: round_to_one_decimal(stop.delta_minutes),
            geometry: geo_types::Point::new(stop.lon, stop.lat),
        })?);
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn round_to_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isochrone::ReachedStop;
    use geo::{LineString, MultiPolygon, Polygon};
    use geojson::Value;

    fn single_square_region() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)]),
            vec![],
        )])
    }

    #[test]
    fn polygon_feature_carries_tipo_and_tempo_min() {
        let isochrone = Isochrone {
            region: single_square_region(),
            reached_stops: vec![],
        };
        let collection = assemble(&isochrone, 15.0).unwrap();
        assert_eq!(collection.features.len(), 1);
        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props["tipo"], "isocrona");
        assert_eq!(props["tempo_min"], 15.0);
    }

    #[test]
    fn point_feature_rounds_tempo_min_to_one_decimal() {
        let isochrone = Isochrone {
            region: MultiPolygon::new(vec![]),
            reached_stops: vec![ReachedStop {
                stop_id: "D".to_string(),
                stop_name: "D".to_string(),
                lat: 1.0,
                lon: 2.0,
                delta_minutes: 4.449,
            }],
        };
        let collection = assemble(&isochrone, 10.0).unwrap();
        assert_eq!(collection.features.len(), 1);
        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props["stop_id"], "D");
        assert_eq!(props["tempo_min"], 4.4);
        match collection.features[0].geometry.as_ref().unwrap().value {
            Value::Point(ref coords) => assert_eq!(coords, &vec![2.0, 1.0]),
            _ => panic!("expected a point geometry"),
        }
    }

    #[test]
    fn empty_isochrone_yields_empty_feature_collection() {
        let isochrone = Isochrone::default();
        let collection = assemble(&isochrone, 10.0).unwrap();
        assert!(collection.features.is_empty());
    }
}
