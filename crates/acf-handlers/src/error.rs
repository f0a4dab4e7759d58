//! Error types for artifact handlers
//!
//! Every handler failure is data-level: the engine turns these into a
//! failed `OperationResult` instead of propagating them.

use acf_artifact::{ArtifactError, ArtifactType};
use std::path::PathBuf;

/// Errors reported by an [`ArtifactHandler`](crate::ArtifactHandler)
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// No artifact with this id
    #[error("{artifact_type} not found: {id}")]
    NotFound {
        artifact_type: ArtifactType,
        id: String,
    },

    /// Target exists and overwrite was not requested
    #[error("{artifact_type} already exists: {id}")]
    AlreadyExists {
        artifact_type: ArtifactType,
        id: String,
        path: Option<PathBuf>,
    },

    /// Caller supplied an unusable id or payload
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Payload invariant or conversion failure
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// IO error touching the store
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored file could not be parsed
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Payload could not be rendered for storage
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl HandlerError {
    /// Create not-found error
    pub fn not_found(artifact_type: ArtifactType, id: impl Into<String>) -> Self {
        Self::NotFound {
            artifact_type,
            id: id.into(),
        }
    }

    /// Create already-exists error
    pub fn already_exists(
        artifact_type: ArtifactType,
        id: impl Into<String>,
        path: Option<PathBuf>,
    ) -> Self {
        Self::AlreadyExists {
            artifact_type,
            id: id.into(),
            path,
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create parse error for path
    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this is a missing-artifact error
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
