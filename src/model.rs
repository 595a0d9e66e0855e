//! Core data model.
//!
//! Weekday resolution, GTFS ingestion, and storage are external
//! collaborators; this module only holds the shapes the
//! isochrone engine itself operates on once a [`crate::provider::ScheduleProvider`]
//! has supplied rows for a single service-day.

use serde::{Deserialize, Serialize};

/// Dense integer identity assigned to a stop at stop-index build time.
///
/// `spec.md` §9 ("Source-to-systems re-architectures") prefers a compact
/// integer index over a hash map keyed by the opaque provider-supplied
/// string id, mirroring the teacher's `StopId` newtype.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Deserialize, Serialize,
)]
pub struct StopId(u32);

impl StopId {
    pub fn new(idx: u32) -> Self {
        Self(idx)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A boardable location: `spec.md` §3 "Stop".
///
/// Invariant: `lat`/`lon` are finite. Stops with non-finite or missing
/// position are excluded by [`crate::stops::StopIndex::build`] before this
/// type is ever constructed with bad data.
#[derive(Clone, Debug, PartialEq)]
pub struct Stop {
    pub id: StopId,
    /// The provider's opaque `stop_id`, carried through to output features.
    pub external_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Stop {
    pub fn new(id: StopId, external_id: String, name: String, lat: f64, lon: f64) -> Self {
        Self {
            id,
            external_id,
            name,
            lat,
            lon,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// One inter-stop hop within a single trip instance: `spec.md` §3
/// "Connection". `arr_minute >= dep_minute` is enforced at construction time
/// by [`crate::connections`].
///
/// Trip identity is deliberately not retained here: the engine (`spec.md`
/// §4.D) applies no transfer penalty and no "already boarded this trip"
/// exception, so a trip's onward segments are reachable purely through the
/// arrival label they produce, exactly as the rest of the connection list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Connection {
    pub dep_stop: StopId,
    pub arr_stop: StopId,
    pub dep_minute: i64,
    pub arr_minute: i64,
}

/// A frequency-based trip template: `spec.md` §3 "Frequency rule".
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrequencyRule {
    pub start_minute: i64,
    pub end_minute: i64,
    pub headway_minutes: i64,
}

impl FrequencyRule {
    pub fn is_eligible(&self) -> bool {
        self.headway_minutes > 0
    }
}
