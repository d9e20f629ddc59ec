//! # Configuration System
//!
//! YAML-based configuration for injection runs:
//!
//! - Waveform model (approximant, sample rate, duration, frequencies)
//! - Injection layout (detectors, spacing, output chunk length, edge buffer)
//! - Logging
//! - Worker pool size
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `GWINJECT_CONFIG` environment variable
//! 2. `./gwinject.yaml` (current directory)
//! 3. `~/.config/gwinject/config.yaml` (user config)
//! 4. `/etc/gwinject/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! waveform:
//!   approximant: NewtonianChirp
//!   sample_rate: 2048.0
//!   duration: 8.0
//!   minimum_frequency: 20.0
//!
//! injection:
//!   ifos: [H1, L1]
//!   spacing: 16.0
//!   file_length: 1024.0
//!   fftlength: 2.0
//!
//! workers: 4
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::observe::LogConfig;
use crate::waveform::WaveformGeneratorConfig;

/// Error type for configuration operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("config not found: {0}")]
    NotFound(String),
    /// Failed to read configuration file
    #[error("failed to read config: {0}")]
    ReadError(String),
    /// Failed to parse configuration
    #[error("failed to parse config: {0}")]
    ParseError(String),
    /// Invalid configuration value
    #[error("invalid config: {0}")]
    ValidationError(String),
}

/// Layout of a time-slide injection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionConfig {
    /// Detector identifiers to inject into
    pub ifos: Vec<String>,
    /// Seconds between consecutive signal centres
    pub spacing: f64,
    /// Length of each output chunk file in seconds
    pub file_length: f64,
    /// Seconds excluded at both segment edges
    pub buffer: f64,
    /// Welch segment length in seconds for background PSD estimation
    pub fftlength: f64,
    /// File-name prefix of output chunks
    pub prefix: String,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            ifos: vec!["H1".to_string(), "L1".to_string()],
            spacing: 16.0,
            file_length: 1024.0,
            buffer: 0.0,
            fftlength: 2.0,
            prefix: "inj".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GwInjectConfig {
    /// Configuration format version
    pub version: String,
    pub waveform: WaveformGeneratorConfig,
    pub injection: InjectionConfig,
    pub logging: LogConfig,
    /// Worker threads for the injection pool (0 = one per core)
    pub workers: usize,
}

impl Default for GwInjectConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            waveform: WaveformGeneratorConfig::default(),
            injection: InjectionConfig::default(),
            logging: LogConfig::default(),
            workers: 0,
        }
    }
}

impl GwInjectConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("GWINJECT_CONFIG") {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
            return Self::load_from(&path);
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading configuration");
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Get configuration search paths (excluding the environment variable).
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./gwinject.yaml")];

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "gwinject") {
            paths.push(config_dir.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/gwinject/config.yaml"));

        paths
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.waveform.validate()?;

        let inj = &self.injection;
        if inj.ifos.is_empty() {
            return Err(ConfigError::ValidationError(
                "ifos must name at least one detector".to_string(),
            ));
        }
        if inj.spacing <= 0.0 {
            return Err(ConfigError::ValidationError(
                "spacing must be positive".to_string(),
            ));
        }
        if inj.file_length <= 0.0 {
            return Err(ConfigError::ValidationError(
                "file_length must be positive".to_string(),
            ));
        }
        if inj.buffer < 0.0 {
            return Err(ConfigError::ValidationError(
                "buffer must be non-negative".to_string(),
            ));
        }
        if inj.fftlength <= 0.0 {
            return Err(ConfigError::ValidationError(
                "fftlength must be positive".to_string(),
            ));
        }
        if inj.prefix.is_empty() || inj.prefix.ends_with('-') {
            return Err(ConfigError::ValidationError(format!(
                "prefix '{}' must be non-empty and must not end with '-'",
                inj.prefix
            )));
        }

        Ok(())
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            workers: 4,
            injection: InjectionConfig {
                ifos: vec!["H1".to_string(), "L1".to_string(), "V1".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };

        serde_yaml::to_string(&config).unwrap_or_default()
    }
}
