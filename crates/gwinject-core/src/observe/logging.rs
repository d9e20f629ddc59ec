//! # Structured Logging
//!
//! Structured logging via the `tracing` ecosystem with support for:
//!
//! - Multiple output formats (JSON, Pretty, Compact)
//! - Log level filtering (`RUST_LOG` wins when no explicit filter is set)
//! - An optional log file written alongside stderr
//!
//! ## Example
//!
//! ```rust,ignore
//! use gwinject_core::observe::{init_logging, LogConfig, LogLevel};
//!
//! let config = LogConfig {
//!     level: LogLevel::Debug,
//!     file: Some("run/generate_waveforms.log".into()),
//!     ..Default::default()
//! };
//! init_logging(&config)?;
//!
//! tracing::info!(n_samples = 1024, "Generating waveforms");
//! ```

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (machine-readable)
    Json,
    /// Pretty format (human-readable, multi-line)
    Pretty,
    /// Compact format (one line per event)
    #[default]
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Log file path; events go to stderr and, when set, to this file too
    pub file: Option<PathBuf>,
    /// Include source location (file:line)
    pub source_location: bool,
    pub thread_names: bool,
    /// Module filter (e.g., "gwinject_sim=debug,gwinject_core=info")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            file: None,
            source_location: false,
            thread_names: false,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Verbose configuration used by `--verbose` on the command line.
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            source_location: true,
            thread_names: true,
            ..Default::default()
        }
    }

    /// Map a `-v` count onto a level: 0 keeps the configured level.
    pub fn with_verbosity(mut self, count: u8) -> Self {
        self.level = match count {
            0 => self.level,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        };
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    fn env_filter(&self) -> EnvFilter {
        match self.filter {
            Some(ref custom) => EnvFilter::try_new(custom)
                .unwrap_or_else(|_| EnvFilter::new(self.level.to_string())),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.to_string())),
        }
    }
}

/// Initialize the global logging subscriber.
///
/// Only the first call installs a subscriber; later calls are ignored. The
/// log file (if any) is opened in append mode and its parent directory must
/// already exist.
pub fn init_logging(config: &LogConfig) -> std::io::Result<()> {
    let file_layer = match config.file {
        Some(ref path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(file_layer);

    let result = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location)
                    .with_thread_names(config.thread_names),
            ),
        ),
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location)
                    .with_thread_names(config.thread_names),
            ),
        ),
        LogFormat::Compact => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location)
                    .with_thread_names(config.thread_names),
            ),
        ),
    };

    // Ignore error if subscriber was already set
    let _ = result;
    Ok(())
}
