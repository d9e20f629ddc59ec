//! Per-segment injection
//!
//! For one contiguous background segment `[t0, tf)`:
//!
//! ```text
//! times      = t0 + buffer, t0 + buffer + spacing, ...  < tf - buffer
//! params     = prior.sample(len(times)),  geocent_time = times + duration / 2
//! raw        = generator.generate(params)                (finite or abort)
//! for each detector (in parallel):
//!     psd    = welch(background)
//!     h      = project(raw, params, detector, psd)       (+ optimal SNR)
//!     background[times[i] .. times[i] + duration] += h[i]
//! write background in file_length chunks:  <prefix>-<t0>-<length>.gwd
//! ```
//!
//! Each signal window starts at `times[i]`, so with the half-duration roll
//! applied during projection the coalescence lands on `geocent_time`.
//! Nothing is written until every detector has been injected.

use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

use gwinject_core::params::GEOCENT_TIME;
use gwinject_core::{
    ConfigError, DetectorProjector, GpsSeconds, InjectResult, InjectionConfig, InjectionError,
    Interferometer, ParameterSet, SignalBatchGenerator, TimeSeries, WaveformModel,
};

use crate::prior::PriorSampler;
use crate::store::{write_timeseries, Segment, TimeSlide};

/// Relative tolerance when comparing background and model sample rates
const RATE_TOLERANCE: f64 = 1e-9;

/// Signal start times: `start + buffer + k * spacing` strictly below
/// `stop - buffer`.
pub fn signal_times(
    start: GpsSeconds,
    stop: GpsSeconds,
    buffer: f64,
    spacing: f64,
) -> Vec<GpsSeconds> {
    let first = start + buffer;
    let last = stop - buffer;
    if spacing <= 0.0 || last <= first {
        return Vec::new();
    }
    let count = ((last - first) / spacing).ceil() as usize;
    (0..count).map(|k| first + k as f64 * spacing).collect()
}

/// `[t0, t0 + file_length)` windows tiling `[start, stop)`; the last one is
/// clipped to `stop`.
pub fn chunk_windows(
    start: GpsSeconds,
    stop: GpsSeconds,
    file_length: f64,
) -> Vec<(GpsSeconds, GpsSeconds)> {
    if file_length <= 0.0 || stop <= start {
        return Vec::new();
    }
    let count = ((stop - start) / file_length).ceil() as usize;
    (0..count)
        .map(|k| {
            let t0 = start + k as f64 * file_length;
            (t0, (t0 + file_length).min(stop))
        })
        .collect()
}

/// Outcome of injecting one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentReport {
    pub t0: GpsSeconds,
    pub tf: GpsSeconds,
    /// Sampled parameters with the realized `geocent_time` and one
    /// `snr_<IFO>` column per detector
    pub parameters: ParameterSet,
    /// Chunk files written, in time order
    pub files: Vec<PathBuf>,
}

impl SegmentReport {
    pub fn num_injections(&self) -> usize {
        self.parameters.len()
    }
}

/// Name of the per-detector SNR column.
pub fn snr_column(ifo: &str) -> String {
    format!("snr_{}", ifo)
}

/// Injects simulated signals into background segments.
#[derive(Debug, Clone)]
pub struct SegmentInjector {
    generator: SignalBatchGenerator,
    projector: DetectorProjector,
    ifos: Vec<Interferometer>,
    config: InjectionConfig,
}

impl SegmentInjector {
    /// Detector names are resolved up front, so an unknown detector fails
    /// here rather than partway through a run.
    pub fn new(model: Arc<dyn WaveformModel>, config: &InjectionConfig) -> InjectResult<Self> {
        if config.ifos.is_empty() {
            return Err(
                ConfigError::ValidationError("at least one detector is required".to_string()).into(),
            );
        }
        if !(config.spacing > 0.0 && config.file_length > 0.0 && config.fftlength > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "spacing ({}), file_length ({}) and fftlength ({}) must be positive",
                config.spacing, config.file_length, config.fftlength
            ))
            .into());
        }
        if config.buffer < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "buffer must be non-negative, got {}",
                config.buffer
            ))
            .into());
        }

        let ifos = config
            .ifos
            .iter()
            .map(|name| Interferometer::from_name(name))
            .collect::<InjectResult<Vec<_>>>()?;
        let projector = DetectorProjector::from_model(model.as_ref());
        let generator = SignalBatchGenerator::new(model)?;

        Ok(Self {
            generator,
            projector,
            ifos,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &InjectionConfig {
        &self.config
    }

    pub fn generator(&self) -> &SignalBatchGenerator {
        &self.generator
    }

    pub fn projector(&self) -> &DetectorProjector {
        &self.projector
    }

    pub fn ifo_names(&self) -> Vec<&str> {
        self.ifos.iter().map(Interferometer::name).collect()
    }

    /// Inject one segment of `source` and write the result under
    /// `destination`.
    ///
    /// Detectors are processed on the current rayon pool.
    pub fn inject(
        &self,
        segment: &Segment,
        destination: &TimeSlide,
        prior: &mut dyn PriorSampler,
    ) -> InjectResult<SegmentReport> {
        let cfg = &self.config;
        let duration = self.generator.duration();
        let sample_rate = self.generator.sample_rate();

        let times = signal_times(segment.t0(), segment.tf(), cfg.buffer, cfg.spacing);
        tracing::info!(
            t0 = segment.t0(),
            tf = segment.tf(),
            n_signals = times.len(),
            "Injecting segment"
        );

        let mut params = prior.sample(times.len())?;
        params.insert(
            GEOCENT_TIME,
            times.iter().map(|t| t + duration / 2.0).collect(),
        )?;

        let raw = self.generator.generate(&params)?;
        raw.ensure_finite()?;

        let ifo_names = self.ifo_names();
        let data = segment.load(&ifo_names)?;
        if (data.sample_rate - sample_rate).abs() > RATE_TOLERANCE * sample_rate {
            return Err(InjectionError::Shape(format!(
                "segment [{}, {}) is sampled at {} Hz but waveforms are generated at {} Hz",
                segment.t0(),
                segment.tf(),
                data.sample_rate,
                sample_rate
            )));
        }

        let injected = self
            .ifos
            .par_iter()
            .zip(data.series.into_par_iter())
            .map(|(ifo, mut background)| -> InjectResult<(TimeSeries, Vec<f64>)> {
                let psd = background.psd(cfg.fftlength)?;
                let projected =
                    self.projector
                        .project_onto(&raw, &params, ifo, Some(&psd), true)?;
                for (start, signal) in times.iter().zip(projected.signals()) {
                    background.inject(&TimeSeries::new(*start, sample_rate, signal.to_vec()))?;
                }

                let snr = projected.snr().map(<[f64]>::to_vec).unwrap_or_default();
                tracing::debug!(
                    ifo = ifo.name(),
                    psd_bins = psd.len(),
                    max_snr = snr.iter().copied().fold(0.0f64, f64::max),
                    "Injected detector"
                );
                Ok((background, snr))
            })
            .collect::<InjectResult<Vec<_>>>()?;

        for (ifo, (_, snr)) in self.ifos.iter().zip(&injected) {
            params.insert(snr_column(ifo.name()), snr.clone())?;
        }

        let mut files = Vec::new();
        for (w0, w1) in chunk_windows(segment.t0(), segment.tf(), cfg.file_length) {
            let chunks: Vec<TimeSeries> = injected.iter().map(|(ts, _)| ts.crop(w0, w1)).collect();
            let Some(first) = chunks.first() else {
                continue;
            };
            if first.is_empty() {
                continue;
            }
            let window_times = first.times();
            let channels: Vec<(&str, &[f64])> = ifo_names
                .iter()
                .zip(&chunks)
                .map(|(name, ts)| (*name, ts.data()))
                .collect();
            files.push(write_timeseries(
                destination.path(),
                &cfg.prefix,
                &window_times,
                sample_rate,
                &channels,
            )?);
        }

        Ok(SegmentReport {
            t0: segment.t0(),
            tf: segment.tf(),
            parameters: params,
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prior::PriorDict;
    use crate::test_support::*;
    use approx::assert_abs_diff_eq;
    use tempfile::TempDir;

    fn prior(seed: u64) -> PriorDict {
        PriorDict::parse(PRIOR_YAML, Some(seed)).unwrap()
    }

    fn dirs() -> (TempDir, TimeSlide, TimeSlide) {
        let tmp = TempDir::new().unwrap();
        let src = TimeSlide::create(tmp.path().join("background")).unwrap();
        let dst = TimeSlide::create(tmp.path().join("injected")).unwrap();
        (tmp, src, dst)
    }

    #[test]
    fn test_signal_times() {
        let t = signal_times(0.0, 64.0, 0.0, 8.0);
        assert_eq!(t, vec![0.0, 8.0, 16.0, 24.0, 32.0, 40.0, 48.0, 56.0]);

        let t = signal_times(100.0, 164.0, 4.0, 8.0);
        assert_eq!(t.len(), 7);
        assert_eq!(t[0], 104.0);
        assert_eq!(*t.last().unwrap(), 152.0);

        assert!(signal_times(0.0, 10.0, 5.0, 1.0).is_empty());
        assert!(signal_times(0.0, 10.0, 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_chunk_windows() {
        assert_eq!(chunk_windows(0.0, 64.0, 32.0), vec![(0.0, 32.0), (32.0, 64.0)]);
        assert_eq!(
            chunk_windows(0.0, 70.0, 32.0),
            vec![(0.0, 32.0), (32.0, 64.0), (64.0, 70.0)]
        );
        assert_eq!(chunk_windows(10.0, 20.0, 1024.0), vec![(10.0, 20.0)]);
        assert!(chunk_windows(5.0, 5.0, 1.0).is_empty());
    }

    #[test]
    fn test_inject_segment() {
        let (_tmp, src, dst) = dirs();
        write_background(src.path(), 0.0, 64.0, 16.0, FS, &["H1", "L1"], 7);
        let src = TimeSlide::open(src.path()).unwrap();
        assert_eq!(src.segments().len(), 1);

        let injector = SegmentInjector::new(chirp_model(), &injection_config(&["H1", "L1"])).unwrap();
        let report = injector
            .inject(&src.segments()[0], &dst, &mut prior(3))
            .unwrap();

        assert_eq!(report.num_injections(), 8);
        let geocent = report.parameters.get(GEOCENT_TIME).unwrap();
        for (k, t) in geocent.iter().enumerate() {
            assert_eq!(*t, 8.0 * k as f64 + DURATION / 2.0);
        }
        for ifo in ["H1", "L1"] {
            let snr = report.parameters.get(&snr_column(ifo)).unwrap();
            assert_eq!(snr.len(), 8);
            assert!(snr.iter().all(|s| s.is_finite() && *s > 0.0));
        }

        let names: Vec<String> = report
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["inj-0-32.gwd", "inj-32-32.gwd"]);
    }

    #[test]
    fn test_output_is_background_plus_signals() {
        let (_tmp, src, dst) = dirs();
        write_background(src.path(), 0.0, 64.0, 32.0, FS, &["H1", "L1"], 11);
        let src = TimeSlide::open(src.path()).unwrap();
        let segment = &src.segments()[0];

        let injector = SegmentInjector::new(chirp_model(), &injection_config(&["H1", "L1"])).unwrap();
        let report = injector.inject(segment, &dst, &mut prior(5)).unwrap();

        let raw = injector.generator().generate(&report.parameters).unwrap();
        let background = segment.load(&["H1", "L1"]).unwrap();
        let output = TimeSlide::open(dst.path()).unwrap();
        assert_eq!(output.segments().len(), 1);
        let output = output.segments()[0].load(&["H1", "L1"]).unwrap();
        assert_eq!(output.times, background.times);

        let starts = signal_times(0.0, 64.0, 0.0, 8.0);
        for (k, ifo) in ["H1", "L1"].iter().enumerate() {
            let projected = injector
                .projector()
                .project(&raw, &report.parameters, ifo, None, false)
                .unwrap();
            let mut expected = background.series[k].clone();
            for (start, signal) in starts.iter().zip(projected.signals()) {
                expected
                    .inject(&TimeSeries::new(*start, FS, signal.to_vec()))
                    .unwrap();
            }
            assert_ne!(expected.data(), background.series[k].data());
            for (a, b) in output.series[k].data().iter().zip(expected.data()) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-35);
            }
        }
    }

    #[test]
    fn test_silent_model_leaves_background() {
        let (_tmp, src, dst) = dirs();
        write_background(src.path(), 0.0, 32.0, 32.0, FS, &["H1"], 2);
        let src = TimeSlide::open(src.path()).unwrap();
        let segment = &src.segments()[0];

        let injector =
            SegmentInjector::new(Arc::new(SilentModel), &injection_config(&["H1"])).unwrap();
        let report = injector.inject(segment, &dst, &mut prior(1)).unwrap();
        assert_eq!(report.num_injections(), 4);
        assert!(report.parameters.get("snr_H1").unwrap().iter().all(|&s| s == 0.0));

        let before = segment.load(&["H1"]).unwrap();
        let after = TimeSlide::open(dst.path()).unwrap().segments()[0]
            .load(&["H1"])
            .unwrap();
        assert_eq!(after.series[0].data(), before.series[0].data());
    }

    #[test]
    fn test_nan_waveform_aborts_before_writing() {
        let (_tmp, src, dst) = dirs();
        write_background(src.path(), 0.0, 32.0, 32.0, FS, &["H1"], 2);
        let src = TimeSlide::open(src.path()).unwrap();

        let injector = SegmentInjector::new(Arc::new(NanModel), &injection_config(&["H1"])).unwrap();
        let err = injector
            .inject(&src.segments()[0], &dst, &mut prior(1))
            .unwrap_err();
        assert!(matches!(err, InjectionError::NumericInstability { .. }));
        assert_eq!(std::fs::read_dir(dst.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_short_segment_is_insufficient() {
        let (_tmp, src, dst) = dirs();
        write_background(src.path(), 0.0, 1.0, 1.0, FS, &["H1"], 4);
        let src = TimeSlide::open(src.path()).unwrap();

        let mut config = injection_config(&["H1"]);
        config.spacing = 0.5;
        let injector = SegmentInjector::new(chirp_model(), &config).unwrap();
        let err = injector
            .inject(&src.segments()[0], &dst, &mut prior(1))
            .unwrap_err();
        assert!(matches!(err, InjectionError::InsufficientData(_)));
        assert_eq!(std::fs::read_dir(dst.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_sample_rate_mismatch() {
        let (_tmp, src, dst) = dirs();
        write_background(src.path(), 0.0, 32.0, 32.0, FS / 2.0, &["H1"], 4);
        let src = TimeSlide::open(src.path()).unwrap();

        let injector = SegmentInjector::new(chirp_model(), &injection_config(&["H1"])).unwrap();
        let err = injector
            .inject(&src.segments()[0], &dst, &mut prior(1))
            .unwrap_err();
        assert!(matches!(err, InjectionError::Shape(_)));
    }

    #[test]
    fn test_unknown_detector_rejected_up_front() {
        let err = SegmentInjector::new(chirp_model(), &injection_config(&["H1", "K9"])).unwrap_err();
        assert!(matches!(err, InjectionError::UnknownDetector(_)));
    }

    #[test]
    fn test_invalid_layout_is_config_error() {
        let mut empty = injection_config(&[]);
        empty.ifos.clear();
        let mut no_spacing = injection_config(&["H1"]);
        no_spacing.spacing = 0.0;
        let mut no_chunks = injection_config(&["H1"]);
        no_chunks.file_length = -1.0;
        let mut no_fft = injection_config(&["H1"]);
        no_fft.fftlength = 0.0;
        let mut negative_buffer = injection_config(&["H1"]);
        negative_buffer.buffer = -2.0;

        for config in [empty, no_spacing, no_chunks, no_fft, negative_buffer] {
            let err = SegmentInjector::new(chirp_model(), &config).unwrap_err();
            assert!(matches!(err, InjectionError::Config(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_missing_detector_channel() {
        let (_tmp, src, dst) = dirs();
        write_background(src.path(), 0.0, 32.0, 32.0, FS, &["H1"], 4);
        let src = TimeSlide::open(src.path()).unwrap();

        let injector = SegmentInjector::new(chirp_model(), &injection_config(&["H1", "L1"])).unwrap();
        let err = injector
            .inject(&src.segments()[0], &dst, &mut prior(1))
            .unwrap_err();
        assert!(matches!(err, InjectionError::Format { .. }));
    }
}
