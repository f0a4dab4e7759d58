//! Error types for the engine
//!
//! Only misconfiguration is an `Err`. Data-level failures travel inside
//! [`OperationResult`](crate::OperationResult).

use acf_artifact::ArtifactType;
use std::path::PathBuf;

/// Fatal engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No handler registered for the requested type
    #[error("no handler registered for artifact type: {0}")]
    HandlerNotFound(ArtifactType),
}

impl EngineError {
    /// Check if this is a missing-handler error
    #[inline]
    #[must_use]
    pub fn is_handler_not_found(&self) -> bool {
        matches!(self, Self::HandlerNotFound(_))
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed config source
    #[error("invalid {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    /// Extension not recognised
    #[error("unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    /// Unknown preset name
    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    /// Unknown log level
    #[error("unknown log level: {0}")]
    UnknownLevel(String),
}

impl ConfigError {
    /// Create parse error
    pub fn parse(format: &'static str, error: impl std::fmt::Display) -> Self {
        Self::Parse {
            format,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = EngineError::HandlerNotFound(ArtifactType::McpServer);
        assert!(err.is_handler_not_found());
        assert_eq!(
            err.to_string(),
            "no handler registered for artifact type: mcp-server"
        );

        let err = ConfigError::parse("toml", "expected `=`");
        assert_eq!(err.to_string(), "invalid toml config: expected `=`");
    }
}
