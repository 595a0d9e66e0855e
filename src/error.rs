//! Core error kinds.
//!
//! `EmptyResult` is intentionally absent here — per spec it "is not an
//! error", and is represented instead as `Ok` of an empty GeoJSON
//! `FeatureCollection` from [`crate::query::compute_isochrone`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed query: non-finite coordinates, non-positive budget, or an
    /// unrecognised weekday. Surfaced directly, never recovered.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The schedule provider could not deliver stops, stop-times, services,
    /// or frequencies for this query. The engine never performs a partial
    /// computation on a failed provider call.
    #[error("schedule unavailable: {0}")]
    ScheduleUnavailable(String),

    /// The caller-supplied deadline elapsed before the search completed. No
    /// partial result is returned.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

pub type Result<T> = std::result::Result<T, Error>;
