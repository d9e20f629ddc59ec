//! IIR Filter implementations
//!
//! Butterworth designs realised as cascaded biquad sections for numerical
//! stability, plus zero-phase (forward-backward) filtering of real buffers.
//!
//! ## Example
//!
//! ```rust
//! use gwinject_core::filters::IirFilter;
//!
//! // 8th-order Butterworth highpass at 20 Hz, 4096 Hz sample rate
//! let hpf = IirFilter::butterworth_highpass(8, 20.0, 4096.0).unwrap();
//! let mut strain = vec![1.0; 4096];
//! hpf.filtfilt(&mut strain);
//! assert!(strain[2048].abs() < 1e-3);
//! ```

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::config::ConfigError;

/// A single biquad (second-order section) filter.
///
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
///
/// Using Direct Form II Transposed for better numerical properties.
#[derive(Debug, Clone)]
pub struct Biquad {
    /// Numerator coefficients [b0, b1, b2]
    b: [f64; 3],
    /// Denominator coefficients [a1, a2] (a0 is normalized to 1)
    a: [f64; 2],
    /// State variables for Direct Form II Transposed
    state: [f64; 2],
}

impl Biquad {
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self { b, a, state: [0.0; 2] }
    }

    /// Process a single real sample using Direct Form II Transposed.
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b[0] * input + self.state[0];
        self.state[0] = self.b[1] * input - self.a[0] * output + self.state[1];
        self.state[1] = self.b[2] * input - self.a[1] * output;
        output
    }

    /// Check if this biquad is stable (poles inside unit circle).
    pub fn is_stable(&self) -> bool {
        self.a[1].abs() < 1.0 && self.a[0].abs() < 1.0 + self.a[1]
    }

    /// Complex response at normalized angular frequency `w` (rad/sample).
    fn response(&self, w: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let num = self.b[0] + self.b[1] * z1 + self.b[2] * z2;
        let den = 1.0 + self.a[0] * z1 + self.a[1] * z2;
        num / den
    }
}

/// IIR filter implemented as a cascade of biquad sections.
#[derive(Debug, Clone)]
pub struct IirFilter {
    sections: Vec<Biquad>,
    order: usize,
}

impl IirFilter {
    /// Design a Butterworth highpass filter.
    ///
    /// # Arguments
    /// * `order` - Filter order (1-20)
    /// * `cutoff_hz` - Cutoff frequency in Hz (-3 dB point)
    /// * `sample_rate` - Sample rate in Hz
    pub fn butterworth_highpass(
        order: usize,
        cutoff_hz: f64,
        sample_rate: f64,
    ) -> Result<Self, ConfigError> {
        if order == 0 || order > 20 {
            return Err(ConfigError::ValidationError(format!(
                "filter order must be 1-20, got {}",
                order
            )));
        }
        if !(cutoff_hz > 0.0 && cutoff_hz < sample_rate / 2.0) {
            return Err(ConfigError::ValidationError(format!(
                "cutoff {} Hz must lie in (0, {}) Hz",
                cutoff_hz,
                sample_rate / 2.0
            )));
        }

        let wc = prewarp(cutoff_hz, sample_rate);
        let k = 2.0 * sample_rate;
        let sections = butterworth_poles(order)
            .into_iter()
            .map(|p| match p {
                PrototypePole::Real(re) => {
                    let (b, a) = highpass_1pole(re * wc, k);
                    Biquad::new(b, a)
                }
                PrototypePole::Pair(p) => {
                    let (b, a) = highpass_2pole(p * wc, k);
                    Biquad::new(b, a)
                }
            })
            .collect();

        Ok(Self { sections, order })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(Biquad::is_stable)
    }

    /// Magnitude response in dB at a frequency.
    pub fn magnitude_response_db(&self, freq_hz: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / sample_rate;
        let h: Complex64 = self.sections.iter().map(|s| s.response(w)).product();
        20.0 * h.norm().max(1e-300).log10()
    }

    /// Causal filtering in place, starting from zero state.
    pub fn filter(&self, samples: &mut [f64]) {
        let mut sections = self.sections.clone();
        for s in samples.iter_mut() {
            let mut y = *s;
            for section in sections.iter_mut() {
                y = section.process(y);
            }
            *s = y;
        }
    }

    /// Zero-phase filtering in place: the buffer is extended by odd
    /// reflection at both ends, filtered forward, reversed, filtered again and
    /// trimmed. The magnitude response is applied twice.
    pub fn filtfilt(&self, samples: &mut [f64]) {
        let n = samples.len();
        if n < 2 {
            return;
        }
        let pad = (3 * (2 * self.sections.len() + 1)).min(n - 1);

        let first = samples[0];
        let last = samples[n - 1];
        let mut ext = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - samples[i]));
        ext.extend_from_slice(samples);
        ext.extend((1..=pad).map(|i| 2.0 * last - samples[n - 1 - i]));

        self.filter(&mut ext);
        ext.reverse();
        self.filter(&mut ext);
        ext.reverse();

        samples.copy_from_slice(&ext[pad..pad + n]);
    }
}

/// Analog prototype pole: a lone real pole or one member of a conjugate pair.
enum PrototypePole {
    Real(f64),
    Pair(Complex64),
}

/// Butterworth analog prototype poles (left half of the unit circle), one
/// entry per conjugate pair plus the real pole for odd orders.
fn butterworth_poles(order: usize) -> Vec<PrototypePole> {
    let mut poles = Vec::with_capacity(order / 2 + 1);
    for k in 0..order / 2 {
        let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
        poles.push(PrototypePole::Pair(Complex64::new(theta.cos(), theta.sin())));
    }
    if order % 2 == 1 {
        poles.push(PrototypePole::Real(-1.0));
    }
    poles
}

/// Pre-warp frequency for bilinear transform.
fn prewarp(freq_hz: f64, sample_rate: f64) -> f64 {
    2.0 * sample_rate * (PI * freq_hz / sample_rate).tan()
}

/// Bilinear transform of a single real pole mapped through `s -> 1/s`.
fn highpass_1pole(p: f64, k: f64) -> ([f64; 3], [f64; 2]) {
    let alpha = k - p;
    let beta = k + p;
    let b0 = k / alpha;
    ([b0, -b0, 0.0], [-beta / alpha, 0.0])
}

/// Bilinear transform of a conjugate pole pair mapped through `s -> 1/s`.
fn highpass_2pole(p: Complex64, k: f64) -> ([f64; 3], [f64; 2]) {
    let p_mag_sq = p.norm_sqr();
    let k2 = k * k;
    let d = k2 - 2.0 * k * p.re + p_mag_sq;

    let a1 = 2.0 * (p_mag_sq - k2) / d;
    let a2 = (k2 + 2.0 * k * p.re + p_mag_sq) / d;
    let g = k2 / d;
    ([g, -2.0 * g, g], [a1, a2])
}
