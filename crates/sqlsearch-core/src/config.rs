//! `sqlsearch` Configuration Module
//!
//! Provides configuration file support via `sqlsearch.toml`, environment variables,
//! and runtime overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Runtime overrides (hints on the statement)
//! 2. Environment variables (`SQLSEARCH_*`, nested keys separated by `__`)
//! 3. Configuration file (`sqlsearch.toml`)
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },
}

/// Join engine configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Sub-queries per multi-search call in a nested-loop join.
    pub multi_search_max_size: usize,
    /// Rows fetched per table when neither a hint nor a LIMIT bounds it.
    pub default_table_limit: usize,
    /// Multi-search batches allowed in flight at once.
    pub max_concurrent_batches: usize,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            multi_search_max_size: 100,
            default_table_limit: 200,
            max_concurrent_batches: 4,
        }
    }
}

/// Search backend connection section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Base URL of the search cluster.
    pub url: String,
    /// Optional username for Basic auth.
    pub username: Option<String>,
    /// Optional password for Basic auth.
    pub password: Option<String>,
    /// Optional API key (takes precedence over Basic auth).
    pub api_key: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            api_key: None,
            timeout_ms: 30_000,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace.
    pub level: String,
    /// Log format: text or json.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Main `sqlsearch` configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SqlSearchConfig {
    /// Join engine configuration.
    pub join: JoinConfig,
    /// Backend connection configuration.
    pub transport: TransportConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl SqlSearchConfig {
    /// Loads configuration from default sources.
    ///
    /// Priority: defaults < file < environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("sqlsearch.toml")
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    /// The merged result is validated before it is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing or validation fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SQLSEARCH_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.join.multi_search_max_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "join.multi_search_max_size".to_string(),
                message: "value must be >= 1".to_string(),
            });
        }

        if self.join.default_table_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "join.default_table_limit".to_string(),
                message: "value must be >= 1".to_string(),
            });
        }

        if !(1..=64).contains(&self.join.max_concurrent_batches) {
            return Err(ConfigError::InvalidValue {
                key: "join.max_concurrent_batches".to_string(),
                message: format!(
                    "value {} is out of range [1, 64]",
                    self.join.max_concurrent_batches
                ),
            });
        }

        if !(self.transport.url.starts_with("http://")
            || self.transport.url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                key: "transport.url".to_string(),
                message: format!(
                    "value '{}' must start with http:// or https://",
                    self.transport.url
                ),
            });
        }

        if self.transport.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "transport.timeout_ms".to_string(),
                message: "value must be > 0".to_string(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        Ok(())
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
