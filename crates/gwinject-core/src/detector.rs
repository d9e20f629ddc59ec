//! Interferometer geometry and antenna response
//!
//! An L-shaped interferometer measures the strain projected onto its
//! detector tensor `D = ½(x⊗x − y⊗y)`, where `x` and `y` are unit vectors
//! along its arms. A gravitational wave arriving from sky position
//! `(ra, dec)` with polarization angle `psi` is described by two
//! polarization tensors `e+` and `e×`; the antenna response to each mode is
//! the full contraction `F = D : e`.
//!
//! ```text
//!               ŷ arm
//!                |
//!                |
//!   vertex  ●----+----- x̂ arm
//! ```
//!
//! The source frame depends on Earth's rotation, so every response takes
//! the GPS time at which it is evaluated.

use serde::{Deserialize, Serialize};

use crate::coordinates::{lla_to_ecef, EcefPosition, LlaPosition, SPEED_OF_LIGHT};
use crate::gps_time::greenwich_mean_sidereal_time;
use crate::types::{GpsSeconds, InjectResult, InjectionError};

/// Built-in detector identifiers.
pub const KNOWN_DETECTORS: [&str; 3] = ["H1", "L1", "V1"];

type Tensor = [[f64; 3]; 3];

/// Gravitational-wave polarization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarization {
    Plus,
    Cross,
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::Plus => write!(f, "plus"),
            Polarization::Cross => write!(f, "cross"),
        }
    }
}

/// Ground-based interferometer.
#[derive(Debug, Clone, PartialEq)]
pub struct Interferometer {
    name: String,
    vertex: EcefPosition,
    x_arm: [f64; 3],
    y_arm: [f64; 3],
    tensor: Tensor,
}

impl Interferometer {
    /// Look up one of the built-in detectors (`H1`, `L1`, `V1`).
    pub fn from_name(name: &str) -> InjectResult<Self> {
        match name {
            "H1" => Ok(Self::from_geodetic(
                "H1",
                LlaPosition::new(46.455_144_0, -119.407_656_9, 142.554),
                125.999_4,
                215.999_4,
                -6.195e-4,
                1.25e-5,
            )),
            "L1" => Ok(Self::from_geodetic(
                "L1",
                LlaPosition::new(30.562_894_4, -90.774_240_4, -6.574),
                197.716_5,
                287.716_5,
                -3.121e-4,
                -6.107e-4,
            )),
            "V1" => Ok(Self::from_geodetic(
                "V1",
                LlaPosition::new(43.631_414_4, 10.504_496_7, 51.884),
                70.567_4,
                160.567_4,
                0.0,
                0.0,
            )),
            other => Err(InjectionError::UnknownDetector(format!(
                "'{}' (known detectors: {})",
                other,
                KNOWN_DETECTORS.join(", ")
            ))),
        }
    }

    /// Build a detector from its geodetic vertex and arm orientation.
    ///
    /// Arm azimuths are in degrees measured from East towards North; tilts
    /// are in radians above the local horizontal.
    pub fn from_geodetic(
        name: impl Into<String>,
        location: LlaPosition,
        x_azimuth_deg: f64,
        y_azimuth_deg: f64,
        x_tilt: f64,
        y_tilt: f64,
    ) -> Self {
        let x_arm = arm_vector(&location, x_azimuth_deg.to_radians(), x_tilt);
        let y_arm = arm_vector(&location, y_azimuth_deg.to_radians(), y_tilt);

        let mut tensor = [[0.0; 3]; 3];
        for (i, row) in tensor.iter_mut().enumerate() {
            for (j, d) in row.iter_mut().enumerate() {
                *d = 0.5 * (x_arm[i] * x_arm[j] - y_arm[i] * y_arm[j]);
            }
        }

        Self {
            name: name.into(),
            vertex: lla_to_ecef(&location),
            x_arm,
            y_arm,
            tensor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vertex position in ECEF meters
    pub fn vertex(&self) -> &EcefPosition {
        &self.vertex
    }

    pub fn x_arm(&self) -> [f64; 3] {
        self.x_arm
    }

    pub fn y_arm(&self) -> [f64; 3] {
        self.y_arm
    }

    pub fn detector_tensor(&self) -> [[f64; 3]; 3] {
        self.tensor
    }

    /// Antenna response to one polarization mode.
    pub fn antenna_response(
        &self,
        ra: f64,
        dec: f64,
        time: GpsSeconds,
        psi: f64,
        mode: Polarization,
    ) -> f64 {
        let (plus, cross) = polarization_tensors(ra, dec, time, psi);
        match mode {
            Polarization::Plus => contract(&self.tensor, &plus),
            Polarization::Cross => contract(&self.tensor, &cross),
        }
    }

    /// `(F+, F×)` evaluated together; the sidereal time is computed once.
    pub fn antenna_pattern(&self, ra: f64, dec: f64, time: GpsSeconds, psi: f64) -> (f64, f64) {
        let (plus, cross) = polarization_tensors(ra, dec, time, psi);
        (contract(&self.tensor, &plus), contract(&self.tensor, &cross))
    }

    /// Arrival time at this detector minus arrival time at the geocenter.
    pub fn time_delay_from_geocenter(&self, ra: f64, dec: f64, time: GpsSeconds) -> f64 {
        let omega = propagation_direction(ra, dec, time);
        -self.vertex.dot(&omega) / SPEED_OF_LIGHT
    }
}

fn arm_vector(location: &LlaPosition, azimuth: f64, tilt: f64) -> [f64; 3] {
    let (east, north, up) = location.enu_basis();
    let (sin_az, cos_az) = azimuth.sin_cos();
    let (sin_tilt, cos_tilt) = tilt.sin_cos();
    let mut arm = [0.0; 3];
    for k in 0..3 {
        arm[k] = cos_tilt * cos_az * east[k] + cos_tilt * sin_az * north[k] + sin_tilt * up[k];
    }
    arm
}

/// Spherical angles of the source in the Earth-fixed frame.
fn earth_fixed_angles(ra: f64, dec: f64, time: GpsSeconds) -> (f64, f64) {
    let phi = ra - greenwich_mean_sidereal_time(time);
    let theta = std::f64::consts::FRAC_PI_2 - dec;
    (theta, phi)
}

/// Unit vector pointing from the geocenter towards the source.
fn propagation_direction(ra: f64, dec: f64, time: GpsSeconds) -> [f64; 3] {
    let (theta, phi) = earth_fixed_angles(ra, dec, time);
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    [sin_theta * cos_phi, sin_theta * sin_phi, cos_theta]
}

fn polarization_tensors(ra: f64, dec: f64, time: GpsSeconds, psi: f64) -> (Tensor, Tensor) {
    let (theta, phi) = earth_fixed_angles(ra, dec, time);
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_psi, cos_psi) = psi.sin_cos();

    let u = [cos_phi * cos_theta, cos_theta * sin_phi, -sin_theta];
    let v = [-sin_phi, cos_phi, 0.0];

    let mut m = [0.0; 3];
    let mut n = [0.0; 3];
    for k in 0..3 {
        m[k] = -u[k] * sin_psi - v[k] * cos_psi;
        n[k] = -u[k] * cos_psi + v[k] * sin_psi;
    }

    let mut plus = [[0.0; 3]; 3];
    let mut cross = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            plus[i][j] = m[i] * m[j] - n[i] * n[j];
            cross[i][j] = m[i] * n[j] + n[i] * m[j];
        }
    }
    (plus, cross)
}

fn contract(a: &Tensor, b: &Tensor) -> f64 {
    a.iter()
        .zip(b.iter())
        .flat_map(|(ra, rb)| ra.iter().zip(rb.iter()).map(|(x, y)| x * y))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const GPS: f64 = 1_187_008_882.4;

    #[test]
    fn test_unknown_detector() {
        let err = Interferometer::from_name("K9").unwrap_err();
        assert!(matches!(err, InjectionError::UnknownDetector(_)));
    }

    #[test]
    fn test_arms_are_orthonormal() {
        for name in KNOWN_DETECTORS {
            let ifo = Interferometer::from_name(name).unwrap();
            let (x, y) = (ifo.x_arm(), ifo.y_arm());
            let dot = |a: [f64; 3], b: [f64; 3]| a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
            assert_abs_diff_eq!(dot(x, x), 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(dot(y, y), 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(dot(x, y), 0.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_detector_tensor_symmetric_traceless() {
        let ifo = Interferometer::from_name("L1").unwrap();
        let d = ifo.detector_tensor();
        let trace = d[0][0] + d[1][1] + d[2][2];
        assert_abs_diff_eq!(trace, 0.0, epsilon = 1e-12);
        for i in 0..3 {
            for j in 0..3 {
                assert_abs_diff_eq!(d[i][j], d[j][i], epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn test_response_is_deterministic() {
        let ifo = Interferometer::from_name("H1").unwrap();
        let a = ifo.antenna_response(1.2, -0.3, GPS, 0.7, Polarization::Plus);
        let b = ifo.antenna_response(1.2, -0.3, GPS, 0.7, Polarization::Plus);
        assert_eq!(a, b);
        let (fp, fc) = ifo.antenna_pattern(1.2, -0.3, GPS, 0.7);
        assert_eq!(fp, a);
        assert_eq!(fc, ifo.antenna_response(1.2, -0.3, GPS, 0.7, Polarization::Cross));
    }

    #[test]
    fn test_total_power_independent_of_psi() {
        let ifo = Interferometer::from_name("V1").unwrap();
        let (fp0, fc0) = ifo.antenna_pattern(4.1, 0.6, GPS, 0.0);
        let reference = fp0 * fp0 + fc0 * fc0;
        assert!(reference <= 1.0 + 1e-12);
        for psi in [0.3, 1.1, 2.5] {
            let (fp, fc) = ifo.antenna_pattern(4.1, 0.6, GPS, psi);
            assert_abs_diff_eq!(fp * fp + fc * fc, reference, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_time_delay_bounded_by_earth_radius() {
        let ifo = Interferometer::from_name("H1").unwrap();
        let max_delay = ifo.vertex().norm() / SPEED_OF_LIGHT;
        for k in 0..20 {
            let ra = k as f64 * 0.31;
            let dec = -1.4 + k as f64 * 0.14;
            let delay = ifo.time_delay_from_geocenter(ra, dec, GPS);
            assert!(delay.abs() <= max_delay + 1e-12);
            assert!(delay.abs() < 0.0215);
        }
    }

    #[test]
    fn test_zenith_source_arrives_early() {
        let ifo = Interferometer::from_name("L1").unwrap();
        let r = ifo.vertex();
        let theta = (r.z / r.norm()).acos();
        let phi = r.y.atan2(r.x);
        let ra = phi + greenwich_mean_sidereal_time(GPS);
        let dec = std::f64::consts::FRAC_PI_2 - theta;
        let delay = ifo.time_delay_from_geocenter(ra, dec, GPS);
        assert_abs_diff_eq!(delay, -r.norm() / SPEED_OF_LIGHT, epsilon = 1e-12);
    }

    #[test]
    fn test_hanford_livingston_light_travel_time() {
        let h1 = Interferometer::from_name("H1").unwrap();
        let l1 = Interferometer::from_name("L1").unwrap();
        let mut max_diff: f64 = 0.0;
        for k in 0..64 {
            let ra = k as f64 * 0.1;
            let dec = (k as f64 * 0.37).sin() * 1.5;
            let dt = h1.time_delay_from_geocenter(ra, dec, GPS)
                - l1.time_delay_from_geocenter(ra, dec, GPS);
            max_diff = max_diff.max(dt.abs());
        }
        assert!(max_diff <= 0.0101);
        assert!(max_diff > 0.002);
    }
}
