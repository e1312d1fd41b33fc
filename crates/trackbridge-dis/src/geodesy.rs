//! WGS84 conversions between ECEF Cartesian and geodetic coordinates.
//!
//! Provides:
//! - ECEF (Earth-Centered Earth-Fixed) in meters to latitude/longitude in
//!   degrees and height above the ellipsoid in meters
//! - the reverse transform, used to build realistic test traffic

use std::f64::consts::PI;

/// Degrees to radians conversion factor
const DTOR: f64 = PI / 180.0;

/// Radians to degrees conversion factor
const RTOD: f64 = 180.0 / PI;

/// WGS84 ellipsoid semi-major axis (equatorial radius) in meters
pub const WGS84_A: f64 = 6378137.0;

/// WGS84 first eccentricity squared
pub const WGS84_E2: f64 = 6.69437999014e-3;

#[inline]
fn wgs84_b() -> f64 {
    WGS84_A * (1.0 - WGS84_E2).sqrt()
}

/// Converts ECEF coordinates to WGS84 latitude/longitude/height.
///
/// Closed-form Bowring approximation: no iteration, sub-millimeter error for
/// terrestrial altitudes.
///
/// # Returns
/// (latitude, longitude, altitude) where lat/lon are in degrees and altitude in meters
///
/// # Example
/// ```
/// use trackbridge_dis::geodesy::ecef_to_geodetic;
///
/// let (lat, lon, alt) = ecef_to_geodetic(6378137.0, 0.0, 0.0);
/// assert!(lat.abs() < 1e-9 && lon.abs() < 1e-9 && alt.abs() < 1e-3);
/// ```
pub fn ecef_to_geodetic(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let b = wgs84_b();
    let ep2 = (WGS84_A * WGS84_A - b * b) / (b * b);

    let lon = y.atan2(x);

    let p = x.hypot(y);
    let th = (z * WGS84_A).atan2(p * b);
    let sin_th = th.sin();
    let cos_th = th.cos();

    // Points deep inside the ellipsoid near the axis push the denominator
    // negative; clamping keeps the latitude within [-90, 90].
    let lat = (z + ep2 * b * sin_th * sin_th * sin_th)
        .atan2((p - WGS84_E2 * WGS84_A * cos_th * cos_th * cos_th).max(0.0));

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    // p / cos(lat) degenerates on the polar axis
    let alt = if cos_lat.abs() > 1e-10 {
        p / cos_lat - n
    } else {
        z.abs() - b
    };

    (lat * RTOD, lon * RTOD, alt)
}

/// Converts WGS84 latitude/longitude/height to ECEF coordinates.
///
/// # Returns
/// ECEF coordinates (x, y, z) in meters
pub fn geodetic_to_ecef(lat: f64, lon: f64, alt: f64) -> (f64, f64, f64) {
    let lat_rad = lat * DTOR;
    let lon_rad = lon * DTOR;

    let slat = lat_rad.sin();
    let clat = lat_rad.cos();

    // Radius of curvature in prime vertical
    let rn = WGS84_A / (1.0 - slat * slat * WGS84_E2).sqrt();

    let x = (rn + alt) * clat * lon_rad.cos();
    let y = (rn + alt) * clat * lon_rad.sin();
    let z = (rn * (1.0 - WGS84_E2) + alt) * slat;

    (x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_equator_prime_meridian() {
        let (lat, lon, alt) = ecef_to_geodetic(WGS84_A, 0.0, 0.0);
        assert_close(lat, 0.0, 1e-9);
        assert_close(lon, 0.0, 1e-9);
        assert_close(alt, 0.0, 1e-3);
    }

    #[test]
    fn test_north_pole() {
        let b = wgs84_b();
        let (lat, _lon, alt) = ecef_to_geodetic(0.0, 0.0, b + 100.0);
        assert_close(lat, 90.0, 1e-9);
        assert_close(alt, 100.0, 1e-3);
    }

    #[test]
    fn test_round_trip() {
        let cases = [
            (38.8977, -77.0365, 50.0),
            (-33.8688, 151.2093, 12.5),
            (64.1466, -21.9426, 1500.0),
            (-54.8019, -68.3030, 0.0),
            (36.5, 179.9, 10000.0),
        ];

        for (lat, lon, alt) in cases {
            let (x, y, z) = geodetic_to_ecef(lat, lon, alt);
            let (lat2, lon2, alt2) = ecef_to_geodetic(x, y, z);
            assert_close(lat2, lat, 1e-7);
            assert_close(lon2, lon, 1e-7);
            assert_close(alt2, alt, 1e-2);
        }
    }

    #[test]
    fn test_origin_is_far_below_surface() {
        let (lat, lon, alt) = ecef_to_geodetic(0.0, 0.0, 0.0);
        assert_close(lat, 0.0, 1e-9);
        assert_close(lon, 0.0, 1e-9);
        assert!(alt < -1000.0);
    }
}
