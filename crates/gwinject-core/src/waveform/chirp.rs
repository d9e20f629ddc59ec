//! Leading-order inspiral chirp
//!
//! Quadrupole (Newtonian) inspiral of a compact binary, evaluated in the
//! time domain. With chirp mass `Mc` expressed in seconds and `τ` the time
//! left to coalescence:
//!
//! ```text
//! f(τ)  = (1/π) (5 / 256τ)^(3/8) Mc^(-5/8)
//! Φ(τ)  = φ_ref + 2 (τ_ref / 5Mc)^(5/8) - 2 (τ / 5Mc)^(5/8)
//! A(τ)  = 4 c Mc^(5/3) (π f)^(2/3) / d
//! h+    = A (1 + cos²ι)/2 cos Φ
//! h×    = A cos ι sin Φ
//! ```
//!
//! Coalescence sits at sample 0 and the inspiral occupies the tail of the
//! buffer (sample `N - j` is `j / fs` seconds before merger). Emission is
//! restricted to `[f_min, min(f_ISCO, 0.95 f_Nyquist)]` and faded in with a
//! cosine taper over the first 10% of its frequency range.

use rayon::prelude::*;
use std::f64::consts::PI;

use super::{RawWaveformBatch, WaveformModel};
use crate::coordinates::SPEED_OF_LIGHT;
use crate::params::ParameterSet;
use crate::types::{InjectResult, InjectionError};

/// G·M_sun / c³ in seconds
const SOLAR_MASS_SECONDS: f64 = 4.925_491_025_543_576e-6;
/// One megaparsec in meters
const MEGAPARSEC_METERS: f64 = 3.085_677_581_491_367e22;
/// Fraction of the frequency range covered by the turn-on taper
const TAPER_FRACTION: f64 = 0.1;

pub const MASS_1: &str = "mass_1";
pub const MASS_2: &str = "mass_2";
pub const LUMINOSITY_DISTANCE: &str = "luminosity_distance";
pub const THETA_JN: &str = "theta_jn";
pub const PHASE: &str = "phase";

/// Newtonian-order chirp model.
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonianChirp {
    sample_rate: f64,
    duration: f64,
    minimum_frequency: f64,
    reference_frequency: f64,
}

/// Per-source quantities validated up front.
#[derive(Debug, Clone, Copy)]
struct Source {
    chirp_mass: f64,
    total_mass: f64,
    distance: f64,
    inclination: f64,
    phase: f64,
}

impl NewtonianChirp {
    pub const APPROXIMANT: &'static str = "NewtonianChirp";

    pub fn new(
        sample_rate: f64,
        duration: f64,
        minimum_frequency: f64,
        reference_frequency: f64,
    ) -> Self {
        Self {
            sample_rate,
            duration,
            minimum_frequency,
            reference_frequency,
        }
    }

    fn sources(params: &ParameterSet) -> InjectResult<Vec<Source>> {
        let m1 = params.require(MASS_1)?;
        let m2 = params.require(MASS_2)?;
        let dist = params.require(LUMINOSITY_DISTANCE)?;
        let theta_jn = params.require(THETA_JN)?;
        let phase = params.require(PHASE)?;

        (0..params.len())
            .map(|i| {
                if !(m1[i] > 0.0 && m2[i] > 0.0 && m1[i].is_finite() && m2[i].is_finite()) {
                    return Err(InjectionError::Parameter(format!(
                        "row {}: masses must be positive and finite (mass_1={}, mass_2={})",
                        i, m1[i], m2[i]
                    )));
                }
                if !(dist[i] > 0.0 && dist[i].is_finite()) {
                    return Err(InjectionError::Parameter(format!(
                        "row {}: luminosity_distance must be positive and finite, got {}",
                        i, dist[i]
                    )));
                }
                if !theta_jn[i].is_finite() || !phase[i].is_finite() {
                    return Err(InjectionError::Parameter(format!(
                        "row {}: theta_jn and phase must be finite",
                        i
                    )));
                }
                let total = m1[i] + m2[i];
                let chirp = (m1[i] * m2[i]).powf(0.6) / total.powf(0.2);
                Ok(Source {
                    chirp_mass: chirp * SOLAR_MASS_SECONDS,
                    total_mass: total * SOLAR_MASS_SECONDS,
                    distance: dist[i] * MEGAPARSEC_METERS,
                    inclination: theta_jn[i],
                    phase: phase[i],
                })
            })
            .collect()
    }

    /// Fill one `[plus | cross]` slab.
    fn render(&self, source: &Source, slab: &mut [f64]) {
        let n = slab.len() / 2;
        let (plus, cross) = slab.split_at_mut(n);
        plus.fill(0.0);
        cross.fill(0.0);

        let mc = source.chirp_mass;
        let f_isco = 1.0 / (6f64.powf(1.5) * PI * source.total_mass);
        let f_max = f_isco.min(0.95 * self.sample_rate / 2.0);
        if n < 2 || f_max <= self.minimum_frequency {
            return;
        }

        let frequency = |tau: f64| (5.0 / (256.0 * tau)).powf(0.375) * mc.powf(-0.625) / PI;
        let tau_of = |f: f64| 5.0 / 256.0 * mc.powf(-5.0 / 3.0) * (PI * f).powf(-8.0 / 3.0);
        let phase_of = |tau: f64| 2.0 * (tau / (5.0 * mc)).powf(0.625);

        let earliest = frequency((n - 1) as f64 / self.sample_rate);
        let f_start = earliest.max(self.minimum_frequency);
        let f_taper = f_start + TAPER_FRACTION * (f_max - f_start);

        let phi_ref = source.phase + phase_of(tau_of(self.reference_frequency));
        let cos_i = source.inclination.cos();
        let plus_factor = 0.5 * (1.0 + cos_i * cos_i);
        let amp_scale = 4.0 * SPEED_OF_LIGHT * mc.powf(5.0 / 3.0) / source.distance;

        for j in 1..n {
            let tau = j as f64 / self.sample_rate;
            let f = frequency(tau);
            if f > f_max {
                continue;
            }
            if f < f_start {
                break;
            }
            let mut amp = amp_scale * (PI * f).powf(2.0 / 3.0);
            if f < f_taper {
                amp *= 0.5 * (1.0 - (PI * (f - f_start) / (f_taper - f_start)).cos());
            }
            let phi = phi_ref - phase_of(tau);
            plus[n - j] = amp * plus_factor * phi.cos();
            cross[n - j] = amp * cos_i * phi.sin();
        }
    }
}

impl WaveformModel for NewtonianChirp {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn minimum_frequency(&self) -> f64 {
        self.minimum_frequency
    }

    fn reference_frequency(&self) -> f64 {
        self.reference_frequency
    }

    fn approximant(&self) -> &str {
        Self::APPROXIMANT
    }

    fn generate(&self, params: &ParameterSet) -> InjectResult<RawWaveformBatch> {
        let sources = Self::sources(params)?;
        let mut batch = RawWaveformBatch::zeros(sources.len(), self.waveform_size());
        batch
            .source_mut()
            .collect::<Vec<_>>()
            .into_par_iter()
            .zip(sources.par_iter())
            .for_each(|(slab, source)| self.render(source, slab));
        Ok(batch)
    }
}
