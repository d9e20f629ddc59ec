//! Optimal matched-filter SNR
//!
//! For a known signal `h(t)` in stationary Gaussian noise with one-sided
//! PSD `S(f)`, the optimal SNR is
//!
//! ```text
//! ρ² = 4 Δf Σ_{f > f_min} |h̃(f)|² / S(f),      h̃ = dt · FFT(h)
//! ```
//!
//! The FFT plan is built once per signal length and shared across threads.

use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

use crate::psd::Psd;
use crate::types::{InjectResult, InjectionError, Sample};

/// Matched-filter SNR calculator for signals of a fixed length.
#[derive(Clone)]
pub struct SnrCalculator {
    size: usize,
    sample_rate: f64,
    minimum_frequency: f64,
    fft: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for SnrCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnrCalculator")
            .field("size", &self.size)
            .field("sample_rate", &self.sample_rate)
            .field("minimum_frequency", &self.minimum_frequency)
            .finish()
    }
}

impl SnrCalculator {
    pub fn new(size: usize, sample_rate: f64, minimum_frequency: f64) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(size);
        Self {
            size,
            sample_rate,
            minimum_frequency,
            fft,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Optimal SNR of `signal` against `psd`.
    ///
    /// Only bins strictly above the minimum frequency contribute. A bin whose
    /// interpolated PSD is not positive makes the spectrum unusable.
    pub fn optimal_snr(&self, signal: &[Sample], psd: &Psd) -> InjectResult<f64> {
        if signal.len() != self.size {
            return Err(InjectionError::length_mismatch(
                "signal length for SNR",
                self.size,
                signal.len(),
            ));
        }

        let mut buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
        self.fft.process(&mut buffer);

        let dt = 1.0 / self.sample_rate;
        let df = self.sample_rate / self.size as f64;

        let mut total = 0.0;
        for (k, bin) in buffer.iter().enumerate().take(self.size / 2 + 1) {
            let f = k as f64 * df;
            if f <= self.minimum_frequency {
                continue;
            }
            let s = psd.value_at(f);
            if !(s > 0.0) {
                return Err(InjectionError::InsufficientData(format!(
                    "degenerate PSD: S({:.3} Hz) = {}",
                    f, s
                )));
            }
            total += bin.norm_sqr() * dt * dt / s;
        }

        Ok((4.0 * df * total).sqrt())
    }
}
