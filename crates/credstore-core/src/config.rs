//! Configuration loading for credstore.
//!
//! Configuration is read once at process start from
//! `~/.config/credstore/config.toml` and threaded into constructors as an
//! explicit [`ConsumptionMode`]; there is no process-wide mutable flag.
//!
//! # Error Handling
//!
//! - If the config file doesn't exist, default values are returned.
//! - If the config file exists but is invalid, an error is returned (fail fast).
//!
//! # Example Configuration
//!
//! ```toml
//! [security]
//! enforce_single_use = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::secret::ConsumptionMode;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Security configuration.
    pub security: SecurityConfig,
}

/// Security-related configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Whether secrets enforce the single-use rule.
    ///
    /// Off by default: enforcement breaks legacy call sites that read a
    /// secret more than once for display or retry purposes. Turn it on to
    /// get a hard [`crate::SecretError::AlreadyConsumed`] failure on any
    /// access after a consuming access.
    pub enforce_single_use: bool,
}

impl Config {
    /// Returns the default configuration file path.
    ///
    /// Returns `~/.config/credstore/config.toml` using `dirs::config_dir()`,
    /// or `None` if the config directory cannot be determined.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("credstore").join("config.toml"))
    }

    /// Load configuration from the default path.
    ///
    /// - Returns `Ok(Config::default())` if no config file exists.
    /// - Returns `Err` if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// The enforcement mode secrets should be constructed with.
    pub fn consumption_mode(&self) -> ConsumptionMode {
        if self.security.enforce_single_use {
            ConsumptionMode::Strict
        } else {
            ConsumptionMode::Permissive
        }
    }
}
