//! Batch waveform generation with mandatory high-pass conditioning
//!
//! Every polarization row leaving the generator has been passed forward and
//! backward through an 8th-order Butterworth high-pass at the model's
//! minimum frequency, suppressing leakage below the band the model emits.

use rayon::prelude::*;
use std::sync::Arc;

use super::{RawWaveformBatch, WaveformModel};
use crate::filters::IirFilter;
use crate::params::ParameterSet;
use crate::types::{InjectResult, InjectionError};

/// Order of the conditioning high-pass
pub const HIGHPASS_ORDER: usize = 8;

/// Drives a [`WaveformModel`] over parameter batches.
#[derive(Clone)]
pub struct SignalBatchGenerator {
    model: Arc<dyn WaveformModel>,
    highpass: IirFilter,
}

impl std::fmt::Debug for SignalBatchGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBatchGenerator")
            .field("approximant", &self.model.approximant())
            .field("sample_rate", &self.model.sample_rate())
            .field("duration", &self.model.duration())
            .field("highpass_hz", &self.model.minimum_frequency())
            .finish()
    }
}

impl SignalBatchGenerator {
    pub fn new(model: Arc<dyn WaveformModel>) -> InjectResult<Self> {
        let highpass = IirFilter::butterworth_highpass(
            HIGHPASS_ORDER,
            model.minimum_frequency(),
            model.sample_rate(),
        )?;
        Ok(Self { model, highpass })
    }

    pub fn model(&self) -> &Arc<dyn WaveformModel> {
        &self.model
    }

    pub fn sample_rate(&self) -> f64 {
        self.model.sample_rate()
    }

    pub fn duration(&self) -> f64 {
        self.model.duration()
    }

    pub fn waveform_size(&self) -> usize {
        self.model.waveform_size()
    }

    /// Generate and high-pass one `(n, 2, waveform_size)` batch.
    ///
    /// Model errors propagate unchanged; a model returning a batch of the
    /// wrong shape is a [`InjectionError::Shape`].
    pub fn generate(&self, params: &ParameterSet) -> InjectResult<RawWaveformBatch> {
        let mut batch = self.model.generate(params)?;

        let expected = (params.len(), 2, self.model.waveform_size());
        if batch.shape() != expected {
            return Err(InjectionError::Shape(format!(
                "model '{}' returned batch of shape {:?}, expected {:?}",
                self.model.approximant(),
                batch.shape(),
                expected
            )));
        }

        let size = expected.2;
        if size > 0 {
            batch
                .as_flat_mut()
                .par_chunks_mut(size)
                .for_each(|row| self.highpass.filtfilt(row));
        }

        tracing::debug!(
            n_samples = params.len(),
            waveform_size = size,
            approximant = self.model.approximant(),
            "Generated raw waveform batch"
        );
        Ok(batch)
    }
}
