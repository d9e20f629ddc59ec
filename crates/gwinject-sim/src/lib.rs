//! # Time-Slide Injection
//!
//! Drives the numeric core over stored detector background:
//!
//! - **Storage**: self-describing `.gwd` dataset files, chunked time-series
//!   named `<prefix>-<t0>-<length>.gwd`, grouped into contiguous segments
//! - **Priors**: YAML-declared one-dimensional priors with seeded sampling
//! - **Segment injection**: sample, generate, project, inject, write
//! - **Pipeline**: all segments of a time-slide on a worker pool, followed by
//!   a single parameter manifest
//! - **Waveform generation**: raw polarization datasets for training
//!
//! ## Example
//!
//! ```rust,no_run
//! use gwinject_core::GwInjectConfig;
//! use gwinject_sim::{PriorDict, TimeSlide, TimeslideInjectionPipeline};
//!
//! let config = GwInjectConfig::load()?;
//! let pipeline = TimeslideInjectionPipeline::from_config(&config)?;
//! let mut prior = PriorDict::from_file("prior.yaml", Some(42))?;
//!
//! let source = TimeSlide::open("background/dt-0.0")?;
//! let summary = pipeline.run(&source, std::path::Path::new("injected/dt-0.0"), &mut prior)?;
//! println!("{} injections", summary.manifest.len());
//! # Ok::<(), gwinject_core::InjectionError>(())
//! ```

pub mod container;
pub mod manifest;
pub mod pipeline;
pub mod prior;
pub mod segment;
pub mod store;
pub mod waveforms;

#[cfg(test)]
mod test_support;

pub use container::{Dataset, DatasetFile};
pub use manifest::{InjectionManifest, MANIFEST_FILE_NAME};
pub use pipeline::{RunSummary, TimeslideInjectionPipeline};
pub use prior::{Prior, PriorDict, PriorSampler};
pub use segment::{chunk_windows, signal_times, SegmentInjector, SegmentReport};
pub use store::{Segment, SegmentData, TimeSlide};
pub use waveforms::{generate_waveforms, GenerateWaveformsOptions, SIGNALS_FILE_NAME};
