//! Change notifications

use acf_artifact::{Artifact, ArtifactType, FieldChange};
use chrono::{DateTime, Utc};
use serde::Serialize;
use ulid::Ulid;

/// What happened to the artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeKind {
    Created {
        artifact: Artifact,
    },
    Updated {
        artifact: Artifact,
        changes: Vec<FieldChange>,
    },
    Deleted {
        /// State before deletion, if it could be read
        #[serde(rename = "deletedArtifact")]
        deleted_artifact: Option<Artifact>,
    },
}

/// Notification emitted after a successful, non-dry-run mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub artifact_type: ArtifactType,
    pub artifact_id: String,
    /// Shared with the history entry and the traffic log
    pub operation_id: Ulid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: ChangeKind,
}

impl ChangeEvent {
    fn new(artifact_type: ArtifactType, artifact_id: String, operation_id: Ulid, kind: ChangeKind) -> Self {
        Self {
            artifact_type,
            artifact_id,
            operation_id,
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Artifact was created
    #[must_use]
    pub fn created(artifact: Artifact, operation_id: Ulid) -> Self {
        Self::new(
            artifact.artifact_type(),
            artifact.id(),
            operation_id,
            ChangeKind::Created { artifact },
        )
    }

    /// Artifact was updated
    #[must_use]
    pub fn updated(artifact: Artifact, changes: Vec<FieldChange>, operation_id: Ulid) -> Self {
        Self::new(
            artifact.artifact_type(),
            artifact.id(),
            operation_id,
            ChangeKind::Updated { artifact, changes },
        )
    }

    /// Artifact was deleted
    #[must_use]
    pub fn deleted(
        artifact_type: ArtifactType,
        artifact_id: impl Into<String>,
        deleted_artifact: Option<Artifact>,
        operation_id: Ulid,
    ) -> Self {
        Self::new(
            artifact_type,
            artifact_id.into(),
            operation_id,
            ChangeKind::Deleted { deleted_artifact },
        )
    }

    /// Event name: `created`, `updated` or `deleted`
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self.kind {
            ChangeKind::Created { .. } => "created",
            ChangeKind::Updated { .. } => "updated",
            ChangeKind::Deleted { .. } => "deleted",
        }
    }

    /// Current artifact state (`None` for deletions)
    #[must_use]
    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.kind {
            ChangeKind::Created { artifact } | ChangeKind::Updated { artifact, .. } => Some(artifact),
            ChangeKind::Deleted { .. } => None,
        }
    }

    /// Field changes (empty unless updated)
    #[must_use]
    pub fn changes(&self) -> &[FieldChange] {
        match &self.kind {
            ChangeKind::Updated { changes, .. } => changes,
            _ => &[],
        }
    }

    /// Pre-delete state
    #[must_use]
    pub fn deleted_artifact(&self) -> Option<&Artifact> {
        match &self.kind {
            ChangeKind::Deleted { deleted_artifact } => deleted_artifact.as_ref(),
            _ => None,
        }
    }
}
