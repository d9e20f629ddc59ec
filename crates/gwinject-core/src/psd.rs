//! Welch PSD: one-sided power spectral density of real strain data
//!
//! Splits the series into overlapping Hann-windowed segments, removes each
//! segment's mean, and averages the periodograms. Median averaging (the
//! default) is robust against glitches in the background; its bias relative
//! to the mean for an exponential distribution is divided out.
//!
//! ```text
//!  data   |=============================================|
//!  seg 0  |-------|
//!  seg 1      |-------|
//!  seg 2          |-------|        step = nperseg - noverlap
//!  ...
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use gwinject_core::psd::{welch, WelchConfig};
//!
//! let config = WelchConfig::new(4096.0, 2.0);
//! let psd = welch(&strain, &config)?;
//! let s_100 = psd.value_at(100.0);
//! ```

use rustfft::{num_complex::Complex64, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::types::{InjectResult, InjectionError, Sample};

/// How per-segment periodograms are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Averaging {
    Mean,
    #[default]
    Median,
}

/// Welch estimator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelchConfig {
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Segment length in seconds
    pub fftlength: f64,
    /// Overlap between consecutive segments in seconds
    pub overlap: f64,
    pub averaging: Averaging,
}

impl WelchConfig {
    /// Median-averaged estimate with 50% overlap.
    pub fn new(sample_rate: f64, fftlength: f64) -> Self {
        Self {
            sample_rate,
            fftlength,
            overlap: fftlength / 2.0,
            averaging: Averaging::Median,
        }
    }

    pub fn with_averaging(mut self, averaging: Averaging) -> Self {
        self.averaging = averaging;
        self
    }

    /// Samples per segment.
    pub fn nperseg(&self) -> usize {
        (self.fftlength * self.sample_rate).round() as usize
    }

    fn noverlap(&self) -> usize {
        (self.overlap * self.sample_rate).round() as usize
    }
}

/// One-sided power spectral density sampled on a uniform grid from 0 Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    df: f64,
    values: Vec<f64>,
}

impl Psd {
    /// Wrap spectral values, rejecting degenerate spectra.
    pub fn new(df: f64, values: Vec<f64>) -> InjectResult<Self> {
        if !(df > 0.0) || values.is_empty() {
            return Err(InjectionError::InsufficientData(format!(
                "degenerate PSD: {} bins at df={}",
                values.len(),
                df
            )));
        }
        if let Some(bad) = values.iter().position(|v| !v.is_finite() || *v < 0.0) {
            return Err(InjectionError::InsufficientData(format!(
                "degenerate PSD: bin {} has value {}",
                bad, values[bad]
            )));
        }
        if values.iter().all(|v| *v == 0.0) {
            return Err(InjectionError::InsufficientData(
                "degenerate PSD: all bins are zero".to_string(),
            ));
        }
        Ok(Self { df, values })
    }

    /// Flat spectrum of `n_bins` bins at `level`.
    pub fn flat(df: f64, n_bins: usize, level: f64) -> InjectResult<Self> {
        Self::new(df, vec![level; n_bins])
    }

    /// Frequency resolution in Hz
    pub fn df(&self) -> f64 {
        self.df
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_frequency(&self) -> f64 {
        (self.values.len() - 1) as f64 * self.df
    }

    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.values.len()).map(|k| k as f64 * self.df).collect()
    }

    /// Linearly interpolated value; clamps outside the sampled range.
    pub fn value_at(&self, frequency: f64) -> f64 {
        let pos = frequency / self.df;
        if pos <= 0.0 {
            return self.values[0];
        }
        let last = self.values.len() - 1;
        let lo = pos.floor() as usize;
        if lo >= last {
            return self.values[last];
        }
        let frac = pos - lo as f64;
        self.values[lo] * (1.0 - frac) + self.values[lo + 1] * frac
    }
}

/// Estimate the one-sided PSD of `data` with Welch's method.
pub fn welch(data: &[Sample], config: &WelchConfig) -> InjectResult<Psd> {
    let n = config.nperseg();
    if n < 2 {
        return Err(InjectionError::InsufficientData(format!(
            "fftlength {} s at {} Hz gives fewer than 2 samples per segment",
            config.fftlength, config.sample_rate
        )));
    }
    if data.len() < n {
        return Err(InjectionError::InsufficientData(format!(
            "{} samples cannot fill one {} s PSD segment ({} samples)",
            data.len(),
            config.fftlength,
            n
        )));
    }
    let noverlap = config.noverlap().min(n - 1);
    let step = n - noverlap;
    let n_segments = (data.len() - n) / step + 1;
    let n_bins = n / 2 + 1;

    let window = hann_periodic(n);
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let scale = 1.0 / (config.sample_rate * window_power);

    let fft = FftPlanner::<f64>::new().plan_fft_forward(n);
    let mut buffer = vec![Complex64::new(0.0, 0.0); n];

    // bins x segments, so each bin's values are contiguous for the median
    let mut periodograms = vec![0.0; n_bins * n_segments];
    for seg in 0..n_segments {
        let chunk = &data[seg * step..seg * step + n];
        let mean = chunk.iter().sum::<f64>() / n as f64;
        for (b, (x, w)) in buffer.iter_mut().zip(chunk.iter().zip(window.iter())) {
            *b = Complex64::new((x - mean) * w, 0.0);
        }
        fft.process(&mut buffer);

        for k in 0..n_bins {
            let mut p = buffer[k].norm_sqr() * scale;
            let is_nyquist = n % 2 == 0 && k == n / 2;
            if k != 0 && !is_nyquist {
                p *= 2.0;
            }
            periodograms[k * n_segments + seg] = p;
        }
    }

    let values: Vec<f64> = match config.averaging {
        Averaging::Mean => periodograms
            .chunks(n_segments)
            .map(|bin| bin.iter().sum::<f64>() / n_segments as f64)
            .collect(),
        Averaging::Median => {
            let bias = median_bias(n_segments);
            periodograms
                .chunks_mut(n_segments)
                .map(|bin| median(bin) / bias)
                .collect()
        }
    };

    tracing::trace!(
        n_segments,
        n_bins,
        averaging = ?config.averaging,
        "Estimated Welch PSD"
    );

    Psd::new(config.sample_rate / n as f64, values)
}

fn hann_periodic(n: usize) -> Vec<f64> {
    (0..n)
        .map(|k| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * k as f64 / n as f64).cos())
        .collect()
}

/// Ratio of median to mean of `n` exponentially distributed periodogram values.
fn median_bias(n: usize) -> f64 {
    let mut bias = 1.0;
    let mut ii = 2;
    while ii <= 2 * ((n.saturating_sub(1)) / 2) {
        bias += 1.0 / (ii + 1) as f64 - 1.0 / ii as f64;
        ii += 2;
    }
    bias
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn white_noise(n: usize, sigma: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, sigma).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    fn mean_in_band(psd: &Psd) -> f64 {
        let inner = &psd.values()[1..psd.len() - 1];
        inner.iter().sum::<f64>() / inner.len() as f64
    }

    #[test]
    fn test_median_bias() {
        assert_eq!(median_bias(1), 1.0);
        assert_eq!(median_bias(2), 1.0);
        assert_relative_eq!(median_bias(3), 1.0 + 1.0 / 3.0 - 0.5);
        // Converges to ln 2
        assert!((median_bias(10_001) - std::f64::consts::LN_2).abs() < 1e-3);
    }

    #[test]
    fn test_white_noise_level() {
        let fs = 256.0;
        let sigma = 2.0;
        let data = white_noise(256 * 64, sigma, 7);
        let expected = 2.0 * sigma * sigma / fs;

        for averaging in [Averaging::Mean, Averaging::Median] {
            let config = WelchConfig::new(fs, 2.0).with_averaging(averaging);
            let psd = welch(&data, &config).unwrap();
            assert_eq!(psd.len(), 257);
            assert_relative_eq!(psd.df(), 0.5);
            assert_relative_eq!(mean_in_band(&psd), expected, max_relative = 0.1);
        }
    }

    #[test]
    fn test_tone_peak_bin() {
        let fs = 512.0;
        let data: Vec<f64> = (0..512 * 16)
            .map(|i| (2.0 * std::f64::consts::PI * 60.0 * i as f64 / fs).sin())
            .collect();
        let psd = welch(&data, &WelchConfig::new(fs, 1.0)).unwrap();
        let peak = psd
            .values()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k)
            .unwrap();
        assert_eq!(peak, 60);
    }

    #[test]
    fn test_too_short_is_insufficient_data() {
        let data = white_noise(100, 1.0, 1);
        let err = welch(&data, &WelchConfig::new(64.0, 2.0)).unwrap_err();
        assert!(matches!(err, InjectionError::InsufficientData(_)));
    }

    #[test]
    fn test_constant_input_is_degenerate() {
        let data = vec![3.0; 1024];
        let err = welch(&data, &WelchConfig::new(64.0, 2.0)).unwrap_err();
        assert!(matches!(err, InjectionError::InsufficientData(_)));
    }

    #[test]
    fn test_psd_interpolation() {
        let psd = Psd::new(1.0, vec![0.0, 2.0, 4.0, 8.0]).unwrap();
        assert_relative_eq!(psd.value_at(1.5), 3.0);
        assert_relative_eq!(psd.value_at(2.25), 5.0);
        assert_eq!(psd.value_at(-1.0), 0.0);
        assert_eq!(psd.value_at(100.0), 8.0);
        assert_eq!(psd.max_frequency(), 3.0);
        assert_eq!(psd.frequencies(), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_psd_rejects_bad_values() {
        assert!(Psd::new(1.0, vec![1.0, f64::NAN]).is_err());
        assert!(Psd::new(1.0, vec![1.0, -1.0]).is_err());
        assert!(Psd::new(0.0, vec![1.0]).is_err());
        assert!(Psd::new(1.0, vec![]).is_err());
    }
}
