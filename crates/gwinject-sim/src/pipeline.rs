//! Time-slide injection pipeline
//!
//! Walks every segment of a source time-slide in order, injects it with a
//! [`SegmentInjector`] on a dedicated worker pool, and records what was
//! injected. The manifest is written only once every segment has
//! succeeded; a failing segment aborts the run and leaves no manifest.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use gwinject_core::{ConfigError, GwInjectConfig, InjectResult, InjectionConfig, WaveformModel};

use crate::manifest::InjectionManifest;
use crate::prior::PriorSampler;
use crate::segment::SegmentInjector;
use crate::store::TimeSlide;

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Indexed destination time-slide
    pub destination: TimeSlide,
    pub manifest: InjectionManifest,
    pub elapsed_secs: f64,
}

pub struct TimeslideInjectionPipeline {
    injector: SegmentInjector,
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for TimeslideInjectionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeslideInjectionPipeline")
            .field("injector", &self.injector)
            .field("workers", &self.pool.current_num_threads())
            .finish()
    }
}

impl TimeslideInjectionPipeline {
    /// `workers == 0` sizes the pool to the available cores.
    pub fn new(
        model: Arc<dyn WaveformModel>,
        config: &InjectionConfig,
        workers: usize,
    ) -> InjectResult<Self> {
        let injector = SegmentInjector::new(model, config)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("gwinject-{}", i))
            .build()
            .map_err(|e| ConfigError::ValidationError(format!("worker pool: {}", e)))?;
        Ok(Self { injector, pool })
    }

    /// Validate `config` and build the configured waveform model.
    pub fn from_config(config: &GwInjectConfig) -> InjectResult<Self> {
        config.validate()?;
        let model = config.waveform.build()?;
        Self::new(model, &config.injection, config.workers)
    }

    pub fn injector(&self) -> &SegmentInjector {
        &self.injector
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Inject every segment of `source` into chunk files under
    /// `destination` and write the manifest there.
    pub fn run(
        &self,
        source: &TimeSlide,
        destination: &Path,
        prior: &mut dyn PriorSampler,
    ) -> InjectResult<RunSummary> {
        let start = Instant::now();
        let dest = TimeSlide::create(destination)?;
        tracing::info!(
            source = %source.path().display(),
            destination = %dest.path().display(),
            segments = source.segments().len(),
            livetime = source.livetime(),
            workers = self.workers(),
            "Starting injection run"
        );

        let mut manifest = InjectionManifest::new();
        for (index, segment) in source.segments().iter().enumerate() {
            let report = self
                .pool
                .install(|| self.injector.inject(segment, &dest, &mut *prior))
                .map_err(|e| {
                    tracing::error!(segment = index, t0 = segment.t0(), error = %e, "Segment failed");
                    e
                })?;
            manifest.append(&report.parameters)?;
            tracing::info!(
                segment = index,
                injections = report.num_injections(),
                files = report.files.len(),
                "Segment complete"
            );
        }

        let path = manifest.write(dest.path())?;
        let elapsed_secs = start.elapsed().as_secs_f64();
        tracing::info!(
            manifest = %path.display(),
            injections = manifest.len(),
            elapsed_secs,
            "Injection run complete"
        );

        Ok(RunSummary {
            destination: TimeSlide::open(dest.path())?,
            manifest,
            elapsed_secs,
        })
    }
}
