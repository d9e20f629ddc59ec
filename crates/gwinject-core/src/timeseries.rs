//! Uniformly sampled strain series
//!
//! A [`TimeSeries`] pairs a sample buffer with its GPS start time and
//! sample rate. Injection adds one series into another over their time
//! overlap, matching samples by rounding the start offset to whole samples.

use crate::psd::{welch, Psd, WelchConfig};
use crate::types::{GpsSeconds, InjectResult, InjectionError, Sample};

/// Relative tolerance when comparing sample rates
const RATE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    t0: GpsSeconds,
    sample_rate: f64,
    data: Vec<Sample>,
}

impl TimeSeries {
    pub fn new(t0: GpsSeconds, sample_rate: f64, data: Vec<Sample>) -> Self {
        Self {
            t0,
            sample_rate,
            data,
        }
    }

    pub fn zeros(t0: GpsSeconds, sample_rate: f64, len: usize) -> Self {
        Self::new(t0, sample_rate, vec![0.0; len])
    }

    pub fn t0(&self) -> GpsSeconds {
        self.t0
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn dt(&self) -> f64 {
        1.0 / self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate
    }

    /// Half-open `[t0, t0 + duration)`
    pub fn span(&self) -> (GpsSeconds, GpsSeconds) {
        (self.t0, self.t0 + self.duration())
    }

    pub fn times(&self) -> Vec<GpsSeconds> {
        (0..self.data.len())
            .map(|i| self.t0 + i as f64 / self.sample_rate)
            .collect()
    }

    pub fn data(&self) -> &[Sample] {
        &self.data
    }

    pub fn into_data(self) -> Vec<Sample> {
        self.data
    }

    fn index_of(&self, t: GpsSeconds) -> i64 {
        ((t - self.t0) * self.sample_rate).round() as i64
    }

    /// Add `other` into this series where the two overlap in time.
    ///
    /// Samples of `other` falling outside this series are dropped. The
    /// sample rates must agree.
    pub fn inject(&mut self, other: &TimeSeries) -> InjectResult<()> {
        if (self.sample_rate - other.sample_rate).abs() > RATE_TOLERANCE * self.sample_rate {
            return Err(InjectionError::Shape(format!(
                "cannot inject series sampled at {} Hz into series sampled at {} Hz",
                other.sample_rate, self.sample_rate
            )));
        }

        let offset = self.index_of(other.t0);
        let len = self.data.len() as i64;
        let first = (-offset).clamp(0, other.data.len() as i64) as usize;
        let last = (len - offset).clamp(0, other.data.len() as i64) as usize;
        if first >= last {
            return Ok(());
        }

        let start = (offset + first as i64) as usize;
        for (dst, src) in self.data[start..start + (last - first)]
            .iter_mut()
            .zip(&other.data[first..last])
        {
            *dst += *src;
        }
        Ok(())
    }

    /// Sub-series covering `[start, end)`, clipped to this series' span.
    pub fn crop(&self, start: GpsSeconds, end: GpsSeconds) -> TimeSeries {
        let len = self.data.len() as i64;
        let i0 = self.index_of(start).clamp(0, len) as usize;
        let i1 = self.index_of(end).clamp(i0 as i64, len) as usize;
        TimeSeries {
            t0: self.t0 + i0 as f64 / self.sample_rate,
            sample_rate: self.sample_rate,
            data: self.data[i0..i1].to_vec(),
        }
    }

    /// Median-averaged Welch PSD with `fftlength`-second segments.
    pub fn psd(&self, fftlength: f64) -> InjectResult<Psd> {
        welch(&self.data, &WelchConfig::new(self.sample_rate, fftlength))
    }
}
