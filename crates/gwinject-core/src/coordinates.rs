//! Earth-fixed coordinates
//!
//! ECEF (Earth-Centered, Earth-Fixed) and geodetic LLA positions, the WGS-84
//! conversion between them, and the local east/north/up basis at a geodetic
//! point. Detector vertices and arm directions are expressed in ECEF.

use serde::{Deserialize, Serialize};

/// WGS-84 semi-major axis in meters
const WGS84_A: f64 = 6_378_137.0;
/// WGS-84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS-84 first eccentricity squared
const WGS84_E2: f64 = 2.0 * WGS84_F - WGS84_F * WGS84_F;
/// Speed of light in m/s
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Earth-Centered, Earth-Fixed position in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcefPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EcefPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Distance from the geocenter in meters
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Dot product with a direction vector
    pub fn dot(&self, dir: &[f64; 3]) -> f64 {
        self.x * dir[0] + self.y * dir[1] + self.z * dir[2]
    }
}

/// Latitude, Longitude, Altitude (WGS-84 geodetic)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LlaPosition {
    /// Latitude in degrees (-90 to +90)
    pub lat_deg: f64,
    /// Longitude in degrees (-180 to +180)
    pub lon_deg: f64,
    /// Altitude above WGS-84 ellipsoid in meters
    pub alt_m: f64,
}

impl LlaPosition {
    pub fn new(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Self {
        Self { lat_deg, lon_deg, alt_m }
    }

    pub fn lat_rad(&self) -> f64 {
        self.lat_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.lon_deg.to_radians()
    }

    /// Unit vectors (east, north, up) of the local tangent frame, in ECEF
    pub fn enu_basis(&self) -> ([f64; 3], [f64; 3], [f64; 3]) {
        let (sin_lat, cos_lat) = self.lat_rad().sin_cos();
        let (sin_lon, cos_lon) = self.lon_rad().sin_cos();
        let east = [-sin_lon, cos_lon, 0.0];
        let north = [-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat];
        let up = [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat];
        (east, north, up)
    }
}

/// Convert LLA to ECEF using WGS-84 ellipsoid
pub fn lla_to_ecef(lla: &LlaPosition) -> EcefPosition {
    let (sin_lat, cos_lat) = lla.lat_rad().sin_cos();
    let (sin_lon, cos_lon) = lla.lon_rad().sin_cos();

    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    EcefPosition {
        x: (n + lla.alt_m) * cos_lat * cos_lon,
        y: (n + lla.alt_m) * cos_lat * sin_lon,
        z: (n * (1.0 - WGS84_E2) + lla.alt_m) * sin_lat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_equator_prime_meridian() {
        let ecef = lla_to_ecef(&LlaPosition::new(0.0, 0.0, 0.0));
        assert_abs_diff_eq!(ecef.x, WGS84_A, epsilon = 1e-6);
        assert_abs_diff_eq!(ecef.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ecef.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_north_pole() {
        let ecef = lla_to_ecef(&LlaPosition::new(90.0, 0.0, 0.0));
        // Polar radius b = a(1 - f)
        assert_abs_diff_eq!(ecef.z, WGS84_A * (1.0 - WGS84_F), epsilon = 1e-3);
        assert_abs_diff_eq!(ecef.x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_enu_basis_is_orthonormal() {
        let (e, n, u) = LlaPosition::new(46.45, -119.41, 142.0).enu_basis();
        let dot = |a: &[f64; 3], b: &[f64; 3]| a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
        for v in [&e, &n, &u] {
            assert_abs_diff_eq!(dot(v, v), 1.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(dot(&e, &n), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dot(&e, &u), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dot(&n, &u), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_altitude_moves_along_up() {
        let lla = LlaPosition::new(30.56, -90.77, 0.0);
        let base = lla_to_ecef(&lla);
        let raised = lla_to_ecef(&LlaPosition::new(30.56, -90.77, 100.0));
        let (_, _, up) = lla.enu_basis();
        let delta = [raised.x - base.x, raised.y - base.y, raised.z - base.z];
        for k in 0..3 {
            assert_abs_diff_eq!(delta[k], 100.0 * up[k], epsilon = 1e-6);
        }
    }
}
