//! Core types for gravitational-wave injection
//!
//! Sample aliases, the crate-wide error enum and the result alias used by
//! every fallible operation in the injection pipeline.
//!
//! ## Error taxonomy
//!
//! | Variant              | Raised when                                            |
//! |----------------------|--------------------------------------------------------|
//! | `Parameter`          | a waveform model cannot use the supplied parameters    |
//! | `Shape`              | parameter / waveform / series lengths disagree         |
//! | `UnknownDetector`    | a detector identifier has no known geometry            |
//! | `InsufficientData`   | too little data (or a degenerate PSD) for spectra      |
//! | `NumericInstability` | a generated waveform batch contains NaN or infinity    |
//! | `Io`                 | store reads/writes fail; propagated unmodified         |
//!
//! None of these are retried. They surface at the top-level pipeline call.

use crate::config::ConfigError;

/// A real-valued strain sample
pub type Sample = f64;

/// GPS time in seconds
pub type GpsSeconds = f64;

/// Result type for injection operations
pub type InjectResult<T> = Result<T, InjectionError>;

/// Errors that can occur while generating, projecting or injecting signals
#[derive(Debug, thiserror::Error)]
pub enum InjectionError {
    #[error("Parameter error: {0}")]
    Parameter(String),

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Unknown detector: {0}")]
    UnknownDetector(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Numeric instability: {count} non-finite values in {context}")]
    NumericInstability { count: usize, context: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed dataset file {path}: {reason}")]
    Format { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl InjectionError {
    /// Shorthand for a length mismatch between two named quantities
    pub fn length_mismatch(what: &str, expected: usize, actual: usize) -> Self {
        InjectionError::Shape(format!("{}: expected {}, got {}", what, expected, actual))
    }

    /// Whether this error indicates corrupt or unusable input data rather
    /// than a programming or configuration mistake
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            InjectionError::InsufficientData(_)
                | InjectionError::NumericInstability { .. }
                | InjectionError::Format { .. }
        )
    }
}

/// Count the non-finite values in a buffer
pub fn count_non_finite(samples: &[Sample]) -> usize {
    samples.iter().filter(|s| !s.is_finite()).count()
}
