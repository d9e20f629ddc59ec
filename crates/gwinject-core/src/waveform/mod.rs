//! # Waveform models and raw polarization batches
//!
//! A [`WaveformModel`] turns a [`ParameterSet`] of `n` candidate sources into
//! a [`RawWaveformBatch`] of shape `(n, 2, waveform_size)`: for every source a
//! plus and a cross polarization sampled at a fixed rate over a fixed
//! duration. Models are selected by approximant name through
//! [`WaveformGeneratorConfig::build`].
//!
//! ## Batch layout
//!
//! ```text
//! data: [ plus_0 | cross_0 | plus_1 | cross_1 | ... ]
//!         <-size->
//! ```
//!
//! The [`SignalBatchGenerator`] wraps a model and high-passes every row
//! before the batch leaves the generator.

pub mod chirp;
pub mod generator;

pub use chirp::NewtonianChirp;
pub use generator::SignalBatchGenerator;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ConfigError;
use crate::detector::Polarization;
use crate::params::ParameterSet;
use crate::types::{count_non_finite, InjectResult, InjectionError, Sample};

/// Source-model capability consumed by the injection pipeline.
///
/// Implementations must be deterministic: identical parameters give
/// identical batches.
pub trait WaveformModel: Send + Sync {
    /// Sample rate in Hz
    fn sample_rate(&self) -> f64;

    /// Waveform duration in seconds
    fn duration(&self) -> f64;

    /// Lowest frequency the model emits, in Hz
    fn minimum_frequency(&self) -> f64;

    /// Frequency at which the `phase` parameter is referenced, in Hz
    fn reference_frequency(&self) -> f64;

    fn approximant(&self) -> &str;

    /// Samples per polarization: `round(sample_rate * duration)`
    fn waveform_size(&self) -> usize {
        (self.sample_rate() * self.duration()).round() as usize
    }

    /// Evaluate both polarizations for every row of `params`.
    fn generate(&self, params: &ParameterSet) -> InjectResult<RawWaveformBatch>;
}

/// Stack of `(plus, cross)` polarization pairs, one per parameter row.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWaveformBatch {
    data: Vec<Sample>,
    n_samples: usize,
    waveform_size: usize,
}

impl RawWaveformBatch {
    /// All-zero batch.
    pub fn zeros(n_samples: usize, waveform_size: usize) -> Self {
        Self {
            data: vec![0.0; n_samples * 2 * waveform_size],
            n_samples,
            waveform_size,
        }
    }

    /// Wrap a flat `(n, 2, size)` row-major buffer.
    pub fn from_flat(data: Vec<Sample>, n_samples: usize, waveform_size: usize) -> InjectResult<Self> {
        let expected = n_samples * 2 * waveform_size;
        if data.len() != expected {
            return Err(InjectionError::length_mismatch(
                &format!("raw waveform buffer ({}, 2, {})", n_samples, waveform_size),
                expected,
                data.len(),
            ));
        }
        Ok(Self {
            data,
            n_samples,
            waveform_size,
        })
    }

    /// `(n_samples, 2, waveform_size)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.n_samples, 2, self.waveform_size)
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn waveform_size(&self) -> usize {
        self.waveform_size
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples == 0
    }

    pub fn as_flat(&self) -> &[Sample] {
        &self.data
    }

    pub fn into_flat(self) -> Vec<Sample> {
        self.data
    }

    pub fn polarization(&self, index: usize, mode: Polarization) -> &[Sample] {
        let row = match mode {
            Polarization::Plus => 2 * index,
            Polarization::Cross => 2 * index + 1,
        };
        &self.data[row * self.waveform_size..(row + 1) * self.waveform_size]
    }

    pub fn plus(&self, index: usize) -> &[Sample] {
        self.polarization(index, Polarization::Plus)
    }

    pub fn cross(&self, index: usize) -> &[Sample] {
        self.polarization(index, Polarization::Cross)
    }

    /// `[plus, cross]` slab of one source, `2 * waveform_size` samples.
    pub(crate) fn source_mut(&mut self) -> std::slice::ChunksExactMut<'_, Sample> {
        self.data.chunks_exact_mut(2 * self.waveform_size.max(1))
    }

    /// Flat mutable view, for row-wise post-processing.
    pub(crate) fn as_flat_mut(&mut self) -> &mut [Sample] {
        &mut self.data
    }

    pub fn non_finite_count(&self) -> usize {
        count_non_finite(&self.data)
    }

    /// Fail if any sample is NaN or infinite.
    pub fn ensure_finite(&self) -> InjectResult<()> {
        match self.non_finite_count() {
            0 => Ok(()),
            count => Err(InjectionError::NumericInstability {
                count,
                context: format!(
                    "waveform batch of shape ({}, 2, {})",
                    self.n_samples, self.waveform_size
                ),
            }),
        }
    }

    /// Copy with every sample multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            data: self.data.iter().map(|x| x * factor).collect(),
            n_samples: self.n_samples,
            waveform_size: self.waveform_size,
        }
    }
}

/// Waveform model selection and sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformGeneratorConfig {
    /// Model name (`NewtonianChirp`)
    pub approximant: String,
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Waveform duration in seconds
    pub duration: f64,
    /// Minimum frequency in Hz; also the high-pass corner
    pub minimum_frequency: f64,
    /// Reference frequency in Hz
    pub reference_frequency: f64,
}

impl Default for WaveformGeneratorConfig {
    fn default() -> Self {
        Self {
            approximant: NewtonianChirp::APPROXIMANT.to_string(),
            sample_rate: 4096.0,
            duration: 8.0,
            minimum_frequency: 20.0,
            reference_frequency: 50.0,
        }
    }
}

impl WaveformGeneratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate <= 0.0 {
            return Err(ConfigError::ValidationError(
                "sample_rate must be positive".to_string(),
            ));
        }
        if self.duration <= 0.0 {
            return Err(ConfigError::ValidationError(
                "waveform duration must be positive".to_string(),
            ));
        }
        if self.minimum_frequency <= 0.0 || self.minimum_frequency >= self.sample_rate / 2.0 {
            return Err(ConfigError::ValidationError(format!(
                "minimum_frequency {} Hz must lie in (0, {}) Hz",
                self.minimum_frequency,
                self.sample_rate / 2.0
            )));
        }
        if self.reference_frequency <= 0.0 {
            return Err(ConfigError::ValidationError(
                "reference_frequency must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Instantiate the configured model.
    pub fn build(&self) -> Result<Arc<dyn WaveformModel>, ConfigError> {
        self.validate()?;
        match self.approximant.as_str() {
            NewtonianChirp::APPROXIMANT => Ok(Arc::new(NewtonianChirp::new(
                self.sample_rate,
                self.duration,
                self.minimum_frequency,
                self.reference_frequency,
            ))),
            other => Err(ConfigError::ValidationError(format!(
                "unknown approximant '{}'",
                other
            ))),
        }
    }
}
