//! Soft-delete storage
//!
//! Soft deletes keep the last state of an artifact as tagged JSON under
//! `.claude/.trash/<type>/` before it is removed from the live store.

use crate::error::HandlerError;
use acf_artifact::Artifact;
use std::path::{Path, PathBuf};

/// Trash directory relative to the project root
pub const TRASH_DIR: &str = ".claude/.trash";

/// Location of a trashed artifact
#[must_use]
pub fn trash_path(root: &Path, artifact: &Artifact) -> PathBuf {
    root.join(TRASH_DIR)
        .join(artifact.artifact_type().as_str())
        .join(format!("{}.json", artifact.id().replace('/', "__")))
}

/// Write `artifact` to the trash, replacing any earlier copy
///
/// # Errors
/// Returns error if the trash entry cannot be written
pub async fn stash(root: &Path, artifact: &Artifact) -> Result<PathBuf, HandlerError> {
    let path = trash_path(root, artifact);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| HandlerError::io_error(parent, e))?;
    }

    let mut json =
        serde_json::to_string_pretty(artifact).map_err(|e| HandlerError::Serialization(e.to_string()))?;
    json.push('\n');
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| HandlerError::io_error(&path, e))?;

    tracing::debug!(path = %path.display(), "stashed {} in trash", artifact.id());
    Ok(path)
}
