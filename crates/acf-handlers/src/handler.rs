//! The per-type persistence contract
//!
//! The engine is polymorphic over [`ArtifactHandler`] and knows nothing
//! about on-disk representation. One handler is registered per
//! [`ArtifactType`].

use crate::error::HandlerError;
use acf_artifact::{Artifact, ArtifactChanges, ArtifactType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Successful handler outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    /// Resulting data
    pub data: T,
    /// Where the artifact lives, when the handler has a location
    pub path: Option<PathBuf>,
}

impl<T> Stored<T> {
    /// Outcome without a location
    #[inline]
    #[must_use]
    pub fn new(data: T) -> Self {
        Self { data, path: None }
    }

    /// Outcome stored at `path`
    #[inline]
    #[must_use]
    pub fn at(data: T, path: impl Into<PathBuf>) -> Self {
        Self {
            data,
            path: Some(path.into()),
        }
    }
}

/// Handler result
pub type HandlerResult<T> = Result<Stored<T>, HandlerError>;

/// Options for create
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateOptions {
    /// Replace an existing artifact with the same id
    pub overwrite: bool,
    /// Validate and report without writing
    pub dry_run: bool,
}

impl CreateOptions {
    /// Default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow overwrite
    #[inline]
    #[must_use]
    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    /// Dry run
    #[inline]
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Options for read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadOptions {
    /// Load the markdown body (defaults to true)
    pub include_content: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            include_content: true,
        }
    }
}

impl ReadOptions {
    /// Default options (content included)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata only
    #[inline]
    #[must_use]
    pub fn metadata_only() -> Self {
        Self {
            include_content: false,
        }
    }
}

/// Options for update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateOptions {
    /// Overlay changes on the current state (defaults to true)
    pub merge: bool,
    /// Validate and report without writing
    pub dry_run: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            merge: true,
            dry_run: false,
        }
    }
}

impl UpdateOptions {
    /// Default options (merge)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything except identity
    #[inline]
    #[must_use]
    pub fn replace(mut self) -> Self {
        self.merge = false;
        self
    }

    /// Dry run
    #[inline]
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Options for delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteOptions {
    /// Keep a copy in the trash before removing
    pub soft: bool,
    /// Validate and report without removing
    pub dry_run: bool,
}

impl DeleteOptions {
    /// Default options (hard delete)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Soft delete
    #[inline]
    #[must_use]
    pub fn soft(mut self) -> Self {
        self.soft = true;
        self
    }

    /// Dry run
    #[inline]
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Persistence strategy for one artifact type
///
/// Implementations report data-level failures through [`HandlerError`];
/// they must not assume anything about logging, history or notification,
/// which the engine layers on top.
#[async_trait]
pub trait ArtifactHandler: Send + Sync + Debug {
    /// The type this handler persists
    fn artifact_type(&self) -> ArtifactType;

    /// Store a new artifact
    async fn create(
        &self,
        root: &Path,
        artifact: &Artifact,
        options: &CreateOptions,
    ) -> HandlerResult<Artifact>;

    /// Load an artifact by id
    async fn read(&self, root: &Path, id: &str, options: &ReadOptions) -> HandlerResult<Artifact>;

    /// Apply a partial update and return the new state
    async fn update(
        &self,
        root: &Path,
        id: &str,
        changes: &ArtifactChanges,
        options: &UpdateOptions,
    ) -> HandlerResult<Artifact>;

    /// Remove an artifact
    async fn delete(&self, root: &Path, id: &str, options: &DeleteOptions) -> HandlerResult<()>;

    /// All stored artifacts, sorted by id
    async fn list(&self, root: &Path) -> HandlerResult<Vec<Artifact>>;
}

/// Reject payloads of the wrong variant before touching storage
///
/// # Errors
/// Returns `HandlerError::InvalidInput` on mismatch
pub fn ensure_type(expected: ArtifactType, artifact: &Artifact) -> Result<(), HandlerError> {
    let actual = artifact.artifact_type();
    if actual == expected {
        Ok(())
    } else {
        Err(HandlerError::InvalidInput(format!(
            "{expected} handler cannot store a {actual}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acf_artifact::Rule;

    #[test]
    fn option_defaults() {
        assert!(ReadOptions::default().include_content);
        assert!(UpdateOptions::default().merge);
        assert!(!CreateOptions::default().overwrite);
        assert!(!DeleteOptions::default().soft);
    }

    #[test]
    fn options_deserialize_from_partial_json() {
        let opts: UpdateOptions = serde_json::from_str(r#"{"dryRun": true}"#).unwrap();
        assert!(opts.merge);
        assert!(opts.dry_run);

        let read: ReadOptions = serde_json::from_str("{}").unwrap();
        assert!(read.include_content);
    }

    #[test]
    fn ensure_type_rejects_other_variants() {
        let rule: Artifact = Rule::new("style", "x").into();
        assert!(ensure_type(ArtifactType::Rule, &rule).is_ok());
        assert!(matches!(
            ensure_type(ArtifactType::Skill, &rule),
            Err(HandlerError::InvalidInput(_))
        ));
    }
}
