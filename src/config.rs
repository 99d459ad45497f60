//! Server configuration, persisted as TOML.
//!
//! The file holds the catalog location and import tuning. A missing file means
//! defaults; a malformed one is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::import::{DEFAULT_BATCH_SIZE, ImportSettings};

/// Errors from configuration handling.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read configuration: {path}")]
    #[diagnostic(
        code(libgen::config::read),
        help("Ensure the configuration file is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {path}: {message}")]
    #[diagnostic(
        code(libgen::config::parse),
        help("Check the TOML syntax in the configuration file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write configuration: {path}")]
    #[diagnostic(
        code(libgen::config::write),
        help("Ensure you have write permissions to the configuration directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("database file path is not set in the configuration")]
    #[diagnostic(
        code(libgen::config::database_path_not_set),
        help("Set it with `libgen config database <path>`.")
    )]
    DatabasePathNotSet,
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Import tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Objects per catalog write transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Minimum milliseconds between progress reports.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_progress_interval_ms() -> u64 {
    500
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Catalog database file. Empty when not configured yet.
    #[serde(default)]
    pub database_file_path: String,
    #[serde(default)]
    pub import: ImportConfig,
}

impl ServerConfig {
    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "configuration not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate_and_correct();
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Replace out-of-range values with their defaults.
    pub fn validate_and_correct(&mut self) {
        let trimmed = self.database_file_path.trim();
        if trimmed.len() != self.database_file_path.len() {
            self.database_file_path = trimmed.to_string();
        }
        if self.import.batch_size == 0 {
            tracing::warn!("import.batch_size must be positive, using the default");
            self.import.batch_size = default_batch_size();
        }
    }

    /// The configured catalog path.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if self.database_file_path.trim().is_empty() {
            return Err(ConfigError::DatabasePathNotSet);
        }
        Ok(PathBuf::from(&self.database_file_path))
    }

    pub fn set_database_path(&mut self, path: &Path) {
        self.database_file_path = path.display().to_string();
    }

    pub fn import_settings(&self) -> ImportSettings {
        ImportSettings {
            batch_size: self.import.batch_size.max(1),
            progress_interval: Duration::from_millis(self.import.progress_interval_ms),
        }
    }
}
