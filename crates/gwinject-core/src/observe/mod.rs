//! # Observability
//!
//! Structured logging for injection runs. Every pipeline stage reports
//! through `tracing`; this module only installs the subscriber.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
