//! Geographic primitives: great-circle distance, walking time, and the
//! WGS-84 <-> Web Mercator projection pair used by [`crate::isochrone`] for
//! metric buffering.

/// Mean earth radius in metres, matching `spec.md` §4.A.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two WGS-84 points, in metres.
///
/// Symmetric and non-negative within floating point tolerance.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Minutes required to walk `metres` at [`V_WALK`].
pub fn walk_minutes(metres: f64) -> f64 {
    (metres / 1000.0) / V_WALK_KMH * 60.0
}

/// Default walking speed, 5 km/h/ §6.
pub const V_WALK_KMH: f64 = 5.0;

/// Projects a WGS-84 coordinate to Web Mercator (EPSG:3857) metres.
///
/// Used exclusively for metric buffering in [`crate::isochrone`]; all
/// persistent storage stays in WGS-84.
pub fn to_planar(lat: f64, lon: f64) -> (f64, f64) {
    let x = lon.to_radians() * EARTH_RADIUS_M;
    let lat_clamped = lat.clamp(-85.051_128_78, 85.051_128_78);
    let y = EARTH_RADIUS_M * ((std::f64::consts::FRAC_PI_4 + lat_clamped.to_radians() / 2.0).tan()).ln();
    (x, y)
}

/// Inverse of [`to_planar`]: Web Mercator metres back to WGS-84 degrees.
pub fn to_geographic(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lat, lon)
}
