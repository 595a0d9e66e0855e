//! An in-memory [`ScheduleProvider`] used by the CLI demo and by the
//! engine/isochrone test suites.
//!
//! GTFS/CSV ingestion is out of core scope; this is the one
//! concrete provider the crate ships, the way the teacher's
//! `adapters::cif::CifAdapter` was the one concrete `CsaAdapter`. It holds
//! plain `Vec`s built directly from literals rather than parsing any file
//! format.

use std::collections::HashSet;
use std::convert::Infallible;

use chrono::Weekday;

use super::{FrequencyRow, ScheduleProvider, StopRow, StopTimeRow};

#[derive(Clone, Debug)]
pub struct Service {
    pub service_id: String,
    pub weekdays: [bool; 7],
}

impl Service {
    pub fn every_day(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            weekdays: [true; 7],
        }
    }

    fn runs_on(&self, weekday: Weekday) -> bool {
        self.weekdays[weekday.num_days_from_monday() as usize]
    }
}

/// A fully in-memory schedule: stops, per-trip stop-times (already tagged
/// with a service id), and frequency rules.
#[derive(Clone, Debug, Default)]
pub struct FixtureProvider {
    stops: Vec<StopRow>,
    services: Vec<Service>,
    /// (service_id, stop_time_row)
    stop_times: Vec<(String, StopTimeRow)>,
    frequencies: Vec<FrequencyRow>,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop(mut self, stop_id: &str, name: &str, lat: f64, lon: f64) -> Self {
        self.stops.push(StopRow {
            stop_id: stop_id.to_string(),
            name: name.to_string(),
            lat,
            lon,
        });
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    /// Adds one trip's stop-time pattern, in order. `stops` is
    /// `(stop_id, arrival_min, departure_min)`.
    pub fn with_trip(
        mut self,
        trip_id: &str,
        service_id: &str,
        stops: &[(&str, Option<i64>, Option<i64>)],
    ) -> Self {
        for (seq, (stop_id, arrival_min, departure_min)) in stops.iter().enumerate() {
            self.stop_times.push((
                service_id.to_string(),
                StopTimeRow {
                    trip_id: trip_id.to_string(),
                    stop_id: stop_id.to_string(),
                    arrival_min: *arrival_min,
                    departure_min: *departure_min,
                    stop_sequence: seq as i64,
                },
            ));
        }
        self
    }

    pub fn with_frequency(
        mut self,
        trip_id: &str,
        start_min: i64,
        end_min: i64,
        headway_min: i64,
    ) -> Self {
        self.frequencies.push(FrequencyRow {
            trip_id: trip_id.to_string(),
            start_min,
            end_min,
            headway_min,
        });
        self
    }

    /// The schedule fixture from `spec.md` §8: stops A/B/C/D, trip T1, and
    /// the T2 frequency-expanded `C -> D` template.
    pub fn reference_fixture() -> Self {
        Self::new()
            .with_stop("A", "A", 0.0, 0.0)
            .with_stop("B", "B", 0.0, 0.002)
            .with_stop("C", "C", 0.0, 0.020)
            .with_stop("D", "D", 0.0, 0.022)
            .with_service(Service::every_day("WEEKDAY"))
            .with_trip(
                "T1",
                "WEEKDAY",
                &[("C", None, Some(10 * 60)), ("D", Some(10 * 60 + 4), None)],
            )
            .with_trip(
                "T2",
                "WEEKDAY",
                &[("C", None, Some(0)), ("D", Some(4), None)],
            )
            .with_frequency("T2", 9 * 60, 11 * 60, 30)
    }
}

impl ScheduleProvider for FixtureProvider {
    type Error = Infallible;

    fn stops(&self) -> Result<Vec<StopRow>, Self::Error> {
        Ok(self.stops.clone())
    }

    fn active_services(&self, weekday: Weekday) -> Result<HashSet<String>, Self::Error> {
        Ok(self
            .services
            .iter()
            .filter(|s| s.runs_on(weekday))
            .map(|s| s.service_id.clone())
            .collect())
    }

    fn stop_times_for_services(
        &self,
        service_ids: &HashSet<String>,
    ) -> Result<Vec<StopTimeRow>, Self::Error> {
        let mut rows: Vec<StopTimeRow> = self
            .stop_times
            .iter()
            .filter(|(service_id, _)| service_ids.contains(service_id))
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by(|a, b| {
            a.trip_id
                .cmp(&b.trip_id)
                .then(a.stop_sequence.cmp(&b.stop_sequence))
        });
        Ok(rows)
    }

    fn frequencies_for_trips(
        &self,
        trip_ids: &HashSet<String>,
    ) -> Result<Vec<FrequencyRow>, Self::Error> {
        Ok(self
            .frequencies
            .iter()
            .filter(|f| trip_ids.contains(&f.trip_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_fixture_active_services_are_every_day() {
        let provider = FixtureProvider::reference_fixture();
        let services = provider.active_services(Weekday::Wed).unwrap();
        assert_eq!(services.len(), 1);
    }

    #[test]
    fn reference_fixture_has_four_stops() {
        let provider = FixtureProvider::reference_fixture();
        assert_eq!(provider.stops().unwrap().len(), 4);
    }
}
