//! Engine-wide constants, not configurable by callers unless the
//! interface is explicitly extended. Collected here, following the
//! teacher's habit of keeping tunables as associated constants close to the
//! code that uses them, rather than scattering magic numbers.

/// Maximum walking distance between two stops (or between the origin and a
/// stop) for a walking edge to exist, in metres.
pub const R_WALK_M: f64 = 300.0;

/// Walking speed used throughout, in km/h.
pub const V_WALK_KMH: f64 = crate::geo::V_WALK_KMH;

/// Minimum residual buffer radius, in metres, to avoid degenerate
/// zero-radius geometries.
pub const RHO_MIN_M: f64 = 10.0;

/// Horizon slack added past `T0 + budget` so near-horizon connections
/// remain representable.
pub const HORIZON_SLACK_MIN: i64 = 5;

/// Bucket width, in minutes, used to quantise the connection-table cache
/// key so that queries with nearby horizons share a
/// materialised table.
pub const HORIZON_BUCKET_MINUTES: i64 = 60;

/// Tunable knobs for a single engine run, split out from the fixed
/// constants above so tests can exercise non-default values without
/// touching the spec-frozen constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConstants {
    pub r_walk_m: f64,
    pub v_walk_kmh: f64,
    pub rho_min_m: f64,
    pub horizon_slack_min: i64,
}

impl Default for EngineConstants {
    fn default() -> Self {
        Self {
            r_walk_m: R_WALK_M,
            v_walk_kmh: V_WALK_KMH,
            rho_min_m: RHO_MIN_M,
            horizon_slack_min: HORIZON_SLACK_MIN,
        }
    }
}
