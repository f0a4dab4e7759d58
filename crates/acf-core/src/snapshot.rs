//! Point-in-time artifact state

use acf_artifact::{Artifact, ArtifactType, ArtifactValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable capture of one artifact's state
///
/// `state` is `None` before a create and after a delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub artifact_type: ArtifactType,
    pub artifact_id: String,
    pub timestamp: DateTime<Utc>,
    pub state: Option<Artifact>,
}

impl Snapshot {
    /// Check if the artifact did not exist at capture time
    #[inline]
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.state.is_none()
    }

    /// State as a structural value (`Null` when absent)
    #[must_use]
    pub fn value(&self) -> ArtifactValue {
        self.state
            .as_ref()
            .map_or(ArtifactValue::Null, Artifact::to_value)
    }
}

/// Produces [`Snapshot`]s stamped with the current time
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotCapture;

impl SnapshotCapture {
    /// Create capture
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Capture `state` (cloned) for `artifact_type`/`artifact_id`
    #[must_use]
    pub fn capture(
        &self,
        artifact_type: ArtifactType,
        artifact_id: impl Into<String>,
        state: Option<&Artifact>,
    ) -> Snapshot {
        Snapshot {
            artifact_type,
            artifact_id: artifact_id.into(),
            timestamp: Utc::now(),
            state: state.cloned(),
        }
    }

    /// Capture of an absent artifact
    #[inline]
    #[must_use]
    pub fn absent(&self, artifact_type: ArtifactType, artifact_id: impl Into<String>) -> Snapshot {
        self.capture(artifact_type, artifact_id, None)
    }
}
