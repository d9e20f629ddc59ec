//! Detector projection
//!
//! Turns a raw `(plus, cross)` batch into the strain one detector records.
//! For each source `i`:
//!
//! ```text
//! h_i      = F+(ra, dec, t, psi) · plus_i + F×(ra, dec, t, psi) · cross_i
//! shift    = duration / 2 + Δt_detector(ra, dec, t)
//! h_i     <- roll(h_i, round(shift · fs))          (cyclic)
//! ```
//!
//! The half-duration term moves the coalescence (sample 0 of the raw
//! waveform) to the middle of the window; the propagation delay then aligns
//! it to when the wavefront reaches this detector. The roll wraps around:
//! whatever falls off one end reappears at the other.

use rayon::prelude::*;

use crate::detector::Interferometer;
use crate::params::{ParameterSet, DEC, GEOCENT_TIME, PSI, RA};
use crate::psd::Psd;
use crate::snr::SnrCalculator;
use crate::types::{InjectResult, InjectionError, Sample};
use crate::waveform::{RawWaveformBatch, WaveformModel};

/// One detector's projected strain for every source in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedSignalBatch {
    signals: Vec<Sample>,
    n_samples: usize,
    waveform_size: usize,
    snr: Option<Vec<f64>>,
}

impl ProjectedSignalBatch {
    /// `(n_samples, waveform_size)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_samples, self.waveform_size)
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn waveform_size(&self) -> usize {
        self.waveform_size
    }

    pub fn signal(&self, index: usize) -> &[Sample] {
        &self.signals[index * self.waveform_size..(index + 1) * self.waveform_size]
    }

    pub fn signals(&self) -> impl Iterator<Item = &[Sample]> {
        self.signals.chunks_exact(self.waveform_size.max(1))
    }

    /// Optimal SNR per source; `None` when no PSD was available.
    pub fn snr(&self) -> Option<&[f64]> {
        self.snr.as_deref()
    }
}

/// Projects raw polarization batches onto detectors.
#[derive(Debug, Clone)]
pub struct DetectorProjector {
    sample_rate: f64,
    waveform_duration: f64,
    minimum_frequency: f64,
    snr: SnrCalculator,
}

impl DetectorProjector {
    pub fn new(sample_rate: f64, waveform_duration: f64, minimum_frequency: f64) -> Self {
        let size = (sample_rate * waveform_duration).round() as usize;
        Self {
            sample_rate,
            waveform_duration,
            minimum_frequency,
            snr: SnrCalculator::new(size, sample_rate, minimum_frequency),
        }
    }

    /// Projector matching a model's sampling.
    pub fn from_model(model: &dyn WaveformModel) -> Self {
        Self::new(
            model.sample_rate(),
            model.duration(),
            model.minimum_frequency(),
        )
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn waveform_duration(&self) -> f64 {
        self.waveform_duration
    }

    pub fn minimum_frequency(&self) -> f64 {
        self.minimum_frequency
    }

    pub fn waveform_size(&self) -> usize {
        self.snr.size()
    }

    /// Whole-sample shift applied for a source seen by `ifo`.
    pub fn shift_samples(&self, ifo: &Interferometer, ra: f64, dec: f64, time: f64) -> i64 {
        let shift = self.waveform_duration / 2.0 + ifo.time_delay_from_geocenter(ra, dec, time);
        (shift * self.sample_rate).round_ties_even() as i64
    }

    /// Project onto the named detector.
    pub fn project(
        &self,
        raw: &RawWaveformBatch,
        params: &ParameterSet,
        ifo: &str,
        psd: Option<&Psd>,
        compute_snr: bool,
    ) -> InjectResult<ProjectedSignalBatch> {
        let detector = Interferometer::from_name(ifo)?;
        self.project_onto(raw, params, &detector, psd, compute_snr)
    }

    /// Project onto an explicit detector geometry.
    pub fn project_onto(
        &self,
        raw: &RawWaveformBatch,
        params: &ParameterSet,
        ifo: &Interferometer,
        psd: Option<&Psd>,
        compute_snr: bool,
    ) -> InjectResult<ProjectedSignalBatch> {
        let size = self.waveform_size();
        if raw.n_samples() != params.len() {
            return Err(InjectionError::length_mismatch(
                "raw waveform batch vs parameter rows",
                params.len(),
                raw.n_samples(),
            ));
        }
        if raw.waveform_size() != size {
            return Err(InjectionError::length_mismatch(
                "raw waveform size",
                size,
                raw.waveform_size(),
            ));
        }

        let ra = params.require(RA)?;
        let dec = params.require(DEC)?;
        let psi = params.require(PSI)?;
        let time = params.require(GEOCENT_TIME)?;

        let n = params.len();
        let mut signals = vec![0.0; n * size];
        if size > 0 {
            signals
                .par_chunks_mut(size)
                .enumerate()
                .for_each(|(i, out)| {
                    let (fp, fc) = ifo.antenna_pattern(ra[i], dec[i], time[i], psi[i]);
                    for ((o, p), c) in out.iter_mut().zip(raw.plus(i)).zip(raw.cross(i)) {
                        *o = fp * p + fc * c;
                    }
                    roll(out, self.shift_samples(ifo, ra[i], dec[i], time[i]));
                });
        }

        let snr = match (compute_snr, psd) {
            (true, Some(psd)) => {
                let values = signals
                    .par_chunks(size.max(1))
                    .map(|s| self.snr.optimal_snr(s, psd))
                    .collect::<InjectResult<Vec<f64>>>()?;
                Some(values)
            }
            (true, None) => {
                tracing::warn!(ifo = ifo.name(), "SNR requested without a PSD; SNR unavailable");
                None
            }
            (false, _) => None,
        };

        Ok(ProjectedSignalBatch {
            signals,
            n_samples: n,
            waveform_size: size,
            snr,
        })
    }
}

/// Cyclic rotation: element `i` moves to `(i + shift) mod len`.
pub fn roll(data: &mut [Sample], shift: i64) {
    let n = data.len();
    if n == 0 {
        return;
    }
    let k = shift.rem_euclid(n as i64) as usize;
    data.rotate_right(k);
}
