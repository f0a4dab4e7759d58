//! Engine configuration
//!
//! Two presets are provided:
//! - `development`: DEBUG logging, state attached to logs, 100 history entries
//! - `production`: INFO logging, no state in logs, 20 history entries
//!
//! Configurations can also be loaded from TOML, YAML or JSON:
//!
//! ```toml
//! [logging]
//! level = "WARN"
//! logToConsole = true
//!
//! [versioning]
//! historySize = 50
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Minimum severity that reaches the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Upper-case name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// Check if a message at `level` passes this threshold
    #[inline]
    #[must_use]
    pub fn allows(&self, level: LogLevel) -> bool {
        level >= *self
    }

    /// Equivalent `tracing` level
    #[must_use]
    pub fn to_tracing(self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            _ => Err(ConfigError::UnknownLevel(s.to_string())),
        }
    }
}

/// Logging options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Minimum level
    pub level: LogLevel,
    /// Attach the pre-operation state to update/delete log entries
    pub include_state_in_logs: bool,
    /// Use the active logger; `false` selects the no-op logger
    pub log_to_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        CrudEngineConfig::development().logging
    }
}

/// Versioning options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VersioningConfig {
    /// Record history entries with before/after snapshots
    pub capture_snapshots: bool,
    /// Maximum retained history entries
    pub history_size: usize,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        CrudEngineConfig::development().versioning
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrudEngineConfig {
    pub logging: LoggingConfig,
    pub versioning: VersioningConfig,
}

impl Default for CrudEngineConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl CrudEngineConfig {
    /// Verbose preset for local work
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LoggingConfig {
                level: LogLevel::Debug,
                include_state_in_logs: true,
                log_to_console: true,
            },
            versioning: VersioningConfig {
                capture_snapshots: true,
                history_size: 100,
            },
        }
    }

    /// Quieter preset with a smaller history
    #[must_use]
    pub fn production() -> Self {
        Self {
            logging: LoggingConfig {
                level: LogLevel::Info,
                include_state_in_logs: false,
                log_to_console: true,
            },
            versioning: VersioningConfig {
                capture_snapshots: true,
                history_size: 20,
            },
        }
    }

    /// Resolve a preset by name
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownPreset` for anything but
    /// `development`/`dev` and `production`/`prod`
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::development()),
            "production" | "prod" => Ok(Self::production()),
            _ => Err(ConfigError::UnknownPreset(name.to_string())),
        }
    }

    /// Parse from TOML; missing keys fall back to the development preset
    ///
    /// # Errors
    /// Returns error on malformed input
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::parse("toml", e))
    }

    /// Parse from YAML
    ///
    /// # Errors
    /// Returns error on malformed input
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(source).map_err(|e| ConfigError::parse("yaml", e))
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns error on malformed input
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(source).map_err(|e| ConfigError::parse("json", e))
    }

    /// Load from a file, choosing the format by extension
    ///
    /// # Errors
    /// Returns error if the file is unreadable, has an unknown extension,
    /// or fails to parse
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&source),
            Some("yaml" | "yml") => Self::from_yaml_str(&source),
            Some("json") => Self::from_json_str(&source),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    /// With log level
    #[inline]
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.logging.level = level;
        self
    }

    /// With state attached to logs
    #[inline]
    #[must_use]
    pub fn with_state_in_logs(mut self, enabled: bool) -> Self {
        self.logging.include_state_in_logs = enabled;
        self
    }

    /// With console logging on or off
    #[inline]
    #[must_use]
    pub fn with_console_logging(mut self, enabled: bool) -> Self {
        self.logging.log_to_console = enabled;
        self
    }

    /// With snapshot capture on or off
    #[inline]
    #[must_use]
    pub fn with_snapshots(mut self, enabled: bool) -> Self {
        self.versioning.capture_snapshots = enabled;
        self
    }

    /// With history capacity
    #[inline]
    #[must_use]
    pub fn with_history_size(mut self, size: usize) -> Self {
        self.versioning.history_size = size;
        self
    }
}
