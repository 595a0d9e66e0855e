//! The core entry point: `spec.md` §6 "Core entry point (synchronous
//! call)".
//!
//! Wires the stop index, the connection-table cache, the engine, the
//! isochrone synthesiser and the result assembler into the one call a
//! caller makes, the way the teacher's `main.rs` sequences
//! `TransportNetwork::from_adapter` → `query_lat_lon` →
//! `to_feature_collection`.

use chrono::Weekday;
use geojson::FeatureCollection;

use crate::config::EngineConstants;
use crate::connections::ConnectionTableCache;
use crate::engine::{self, Deadline};
use crate::error::{Error, Result};
use crate::isochrone;
use crate::model::StopId;
use crate::provider::ScheduleProvider;
use crate::stops::StopIndex;
use crate::{assembler, config};

/// Bundles a schedule provider with the stop index and connection-table
/// cache built against it. `stops()` is read exactly once, at
/// construction, matching `spec.md` §9's "materialised up-front" design
/// note; callers that need to pick up new stops must construct a new
/// instance.
pub struct IsochroneService<P: ScheduleProvider> {
    provider: P,
    stops: StopIndex,
    stop_ids: std::collections::HashMap<String, StopId>,
    cache: ConnectionTableCache,
    constants: EngineConstants,
}

impl<P: ScheduleProvider> IsochroneService<P> {
    pub fn new(provider: P) -> Result<Self> {
        Self::with_constants(provider, EngineConstants::default())
    }

    pub fn with_constants(provider: P, constants: EngineConstants) -> Result<Self> {
        let rows = provider
            .stops()
            .map_err(|e| Error::ScheduleUnavailable(e.to_string()))?;
        let stop_ids = rows
            .iter()
            .filter(|r| r.lat.is_finite() && r.lon.is_finite())
            .enumerate()
            .map(|(i, r)| (r.stop_id.clone(), StopId::new(i as u32)))
            .collect();
        let stops = StopIndex::build(rows);

        Ok(Self {
            provider,
            stops,
            stop_ids,
            cache: ConnectionTableCache::new(),
            constants,
        })
    }

    /// Runs one isochrone query.
    ///
    /// Validates input (`InvalidInput`), materialises (or reuses) the
    /// connection table for `(weekday, horizon)` (`ScheduleUnavailable` on
    /// provider failure), runs the earliest-arrival search
    /// (`DeadlineExceeded` if `deadline` has already passed), and returns
    /// the assembled `FeatureCollection`. An origin with no stop in range
    /// is not an error (`spec.md` §6's `NoOrigin` is implemented as the
    /// permitted empty-result alternative): the search simply labels no
    /// stops and the assembler emits an empty `FeatureCollection`.
    pub fn compute_isochrone(
        &self,
        lat: f64,
        lon: f64,
        budget_minutes: i64,
        weekday: Weekday,
        departure_minutes: i64,
        deadline: Option<Deadline>,
    ) -> Result<FeatureCollection> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(Error::InvalidInput("coordinates must be finite".to_string()));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(Error::InvalidInput("latitude out of range".to_string()));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(Error::InvalidInput("longitude out of range".to_string()));
        }
        if budget_minutes <= 0 {
            return Err(Error::InvalidInput("budget_minutes must be positive".to_string()));
        }
        if departure_minutes < 0 {
            return Err(Error::InvalidInput("departure_minutes must be non-negative".to_string()));
        }

        let budget = budget_minutes as f64;
        let departure = departure_minutes as f64;
        let horizon = departure + budget + self.constants.horizon_slack_min as f64;

        let table = self
            .cache
            .get_or_build(&self.provider, weekday, horizon.ceil() as i64, &self.stop_ids)
            .map_err(Error::ScheduleUnavailable)?;

        let arrivals = engine::earliest_arrival(
            &self.stops,
            &table,
            lat,
            lon,
            departure,
            budget,
            &self.constants,
            deadline,
        )?;

        let isochrone = isochrone::synthesize(&self.stops, &arrivals, departure, budget, &self.constants);
        assembler::assemble(&isochrone, budget)
            .map_err(|e| Error::InvalidInput(format!("failed to assemble output geometry: {e}")))
    }
}

/// Convenience wrapper equivalent to building a one-shot
/// [`IsochroneService`] and calling
/// [`IsochroneService::compute_isochrone`]; intended for callers (such as
/// the CLI) that run a single query against a fresh provider rather than
/// serving many queries against a long-lived index.
pub fn compute_isochrone<P: ScheduleProvider>(
    provider: P,
    lat: f64,
    lon: f64,
    budget_minutes: i64,
    weekday: Weekday,
    departure_minutes: i64,
) -> Result<FeatureCollection> {
    let service = IsochroneService::with_constants(provider, config::EngineConstants::default())?;
    service.compute_isochrone(lat, lon, budget_minutes, weekday, departure_minutes, None)
}
