//! The schedule provider interface consumed by the core.
//!
//! GTFS ingestion, the relational/spatial store, and the weekday
//! resolution policy are external collaborators; this trait
//! is the seam between them and the engine. Rows are materialised into
//! plain `Vec`s rather than true lazy streams — `spec.md` §9 explicitly
//! re-architects the source's per-step database queries into one-shot,
//! up-front provider calls, so there is no benefit to laziness here.
//!
//! Generalises the teacher's narrower `CsaAdapter` trait (`stops` /
//! `connections` / `transfers`) into the four GTFS-shaped methods the spec
//! requires; frequency rules and service-calendar resolution have no
//! equivalent in the teacher's CIF adapter (CIF schedules carry no
//! frequencies and one explicit row per day).

use std::collections::HashSet;

/// One row of `stops()`. Only non-null coordinates are
/// yielded; the provider is responsible for withholding stops without a
/// position.
#[derive(Clone, Debug, PartialEq)]
pub struct StopRow {
    pub stop_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// One row of `stop_times_for_services()`. Either time may be
/// absent; [`crate::connections`] drops rows where both are absent.
#[derive(Clone, Debug, PartialEq)]
pub struct StopTimeRow {
    pub trip_id: String,
    pub stop_id: String,
    pub arrival_min: Option<i64>,
    pub departure_min: Option<i64>,
    pub stop_sequence: i64,
}

/// One row of `frequencies_for_trips()`.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyRow {
    pub trip_id: String,
    pub start_min: i64,
    pub end_min: i64,
    pub headway_min: i64,
}

pub trait ScheduleProvider {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Stops with non-null coordinates only.
    fn stops(&self) -> Result<Vec<StopRow>, Self::Error>;

    /// The set of `service_id`s active on the given weekday.
    fn active_services(&self, weekday: chrono::Weekday) -> Result<HashSet<String>, Self::Error>;

    /// Stop-times belonging to trips of the given services, ordered by
    /// `(trip_id, stop_sequence)`.
    fn stop_times_for_services(
        &self,
        service_ids: &HashSet<String>,
    ) -> Result<Vec<StopTimeRow>, Self::Error>;

    /// Frequency rules for the given trips. Trips with no rule run exactly
    /// once, per their stop-times.
    fn frequencies_for_trips(
        &self,
        trip_ids: &HashSet<String>,
    ) -> Result<Vec<FrequencyRow>, Self::Error>;
}

pub mod fixture;
