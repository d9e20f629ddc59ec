//! # Gravitational-Wave Injection Core
//!
//! Numeric building blocks for simulating compact-binary signals and adding
//! them to detector background data:
//!
//! - **Parameter tables**: column-oriented source parameters with a checked
//!   row count
//! - **Waveform models**: raw `(plus, cross)` polarization batches, high-passed
//!   at the model's minimum frequency
//! - **Detector projection**: antenna response, propagation delay and cyclic
//!   re-centring for H1, L1 and V1
//! - **Spectra**: Welch PSD estimation and optimal matched-filter SNR
//! - **Time series**: GPS-stamped strain with additive injection
//!
//! ## Signal Flow
//!
//! ```text
//! ParameterSet → SignalBatchGenerator → RawWaveformBatch
//!              → DetectorProjector (per detector, PSD → SNR)
//!              → ProjectedSignalBatch → TimeSeries::inject
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use gwinject_core::prelude::*;
//!
//! let model = WaveformGeneratorConfig::default().build()?;
//! let generator = SignalBatchGenerator::new(model.clone())?;
//! let projector = DetectorProjector::from_model(model.as_ref());
//!
//! let params = ParameterSet::from_columns([
//!     ("mass_1", vec![30.0]),
//!     ("mass_2", vec![25.0]),
//!     ("luminosity_distance", vec![400.0]),
//!     ("theta_jn", vec![0.3]),
//!     ("phase", vec![0.0]),
//!     ("ra", vec![1.2]),
//!     ("dec", vec![-0.4]),
//!     ("psi", vec![0.7]),
//!     ("geocent_time", vec![1_240_000_004.0]),
//! ])?;
//!
//! let raw = generator.generate(&params)?;
//! let h1 = projector.project(&raw, &params, "H1", None, false)?;
//! assert_eq!(h1.shape(), (1, model.waveform_size()));
//! # Ok::<(), gwinject_core::InjectionError>(())
//! ```

pub mod config;
pub mod coordinates;
pub mod detector;
pub mod filters;
pub mod gps_time;
pub mod observe;
pub mod params;
pub mod projection;
pub mod psd;
pub mod snr;
pub mod timeseries;
pub mod types;
pub mod waveform;

pub use config::{ConfigError, GwInjectConfig, InjectionConfig};
pub use detector::{Interferometer, Polarization};
pub use params::ParameterSet;
pub use projection::{DetectorProjector, ProjectedSignalBatch};
pub use psd::{welch, Averaging, Psd, WelchConfig};
pub use snr::SnrCalculator;
pub use timeseries::TimeSeries;
pub use types::{GpsSeconds, InjectResult, InjectionError, Sample};
pub use waveform::{
    RawWaveformBatch, SignalBatchGenerator, WaveformGeneratorConfig, WaveformModel,
};

/// Prelude for common imports
pub mod prelude {
    pub use crate::detector::{Interferometer, Polarization};
    pub use crate::params::{ParameterSet, DEC, GEOCENT_TIME, PSI, RA};
    pub use crate::projection::{DetectorProjector, ProjectedSignalBatch};
    pub use crate::psd::Psd;
    pub use crate::timeseries::TimeSeries;
    pub use crate::types::{InjectResult, InjectionError};
    pub use crate::waveform::{
        RawWaveformBatch, SignalBatchGenerator, WaveformGeneratorConfig, WaveformModel,
    };
}
