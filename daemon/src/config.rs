//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use lifecert_liveness::LivenessConfig;
use lifecert_recognition::FrCoreConfig;
use lifecert_utils::LogFormat;
use lifecert_verification::VerificationConfig;

const REDACTED: &str = "<redacted>";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for the `lifecert` binary.
///
/// Can be loaded from a TOML file via [`ServiceConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Directory of the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub frcore: FrCoreConfig,

    #[serde(default)]
    pub liveness: LivenessConfig,

    #[serde(default)]
    pub verification: VerificationConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./lifecert_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A copy safe to print: API keys are masked.
    pub fn redacted(&self) -> Self {
        let mask = |key: &str| {
            if key.is_empty() {
                String::new()
            } else {
                REDACTED.to_string()
            }
        };
        let mut copy = self.clone();
        copy.frcore.upload_api_key = mask(&self.frcore.upload_api_key);
        copy.frcore.recognize_api_key = mask(&self.frcore.recognize_api_key);
        copy
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    /// Checks needed before the recognition engine can be called.
    pub fn validate_frcore(&self) -> Result<(), ConfigError> {
        if self.frcore.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("frcore.base_url is required".to_string()));
        }
        if self.frcore.upload_api_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "frcore.upload_api_key is required".to_string(),
            ));
        }
        if self.frcore.recognize_api_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "frcore.recognize_api_key is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks that apply to every command.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map_size_mb == 0 {
            return Err(ConfigError::Invalid("map_size_mb must be positive".to_string()));
        }
        let thresholds = [
            ("verification.distance_threshold", self.verification.distance_threshold),
            ("verification.similarity_threshold", self.verification.similarity_threshold),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            frcore: FrCoreConfig::default(),
            liveness: LivenessConfig::default(),
            verification: VerificationConfig::default(),
        }
    }
}
