//! In-memory handler
//!
//! Keeps artifacts in a map keyed by id. Useful for tests and for hosts
//! that persist artifacts elsewhere. The `root` argument is ignored.

use crate::error::HandlerError;
use crate::handler::{
    ensure_type, ArtifactHandler, CreateOptions, DeleteOptions, HandlerResult, ReadOptions,
    Stored, UpdateOptions,
};
use acf_artifact::{Artifact, ArtifactChanges, ArtifactType};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Map-backed handler for one artifact type
#[derive(Debug)]
pub struct MemoryHandler {
    artifact_type: ArtifactType,
    store: Mutex<BTreeMap<String, Artifact>>,
    trash: Mutex<Vec<Artifact>>,
}

impl MemoryHandler {
    /// Create empty handler
    #[must_use]
    pub fn new(artifact_type: ArtifactType) -> Self {
        Self {
            artifact_type,
            store: Mutex::new(BTreeMap::new()),
            trash: Mutex::new(Vec::new()),
        }
    }

    /// Artifacts removed with a soft delete, oldest first
    #[must_use]
    pub fn trashed(&self) -> Vec<Artifact> {
        self.trash.lock().clone()
    }

    /// Number of stored artifacts
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    /// Check if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}

/// One in-memory handler per artifact type
#[must_use]
pub fn memory_handlers() -> Vec<Arc<dyn ArtifactHandler>> {
    ArtifactType::ALL
        .into_iter()
        .map(|ty| Arc::new(MemoryHandler::new(ty)) as Arc<dyn ArtifactHandler>)
        .collect()
}

#[async_trait]
impl ArtifactHandler for MemoryHandler {
    fn artifact_type(&self) -> ArtifactType {
        self.artifact_type
    }

    async fn create(
        &self,
        _root: &Path,
        artifact: &Artifact,
        options: &CreateOptions,
    ) -> HandlerResult<Artifact> {
        ensure_type(self.artifact_type, artifact)?;
        artifact.validate()?;

        let id = artifact.id();
        let mut store = self.store.lock();
        if store.contains_key(&id) && !options.overwrite {
            return Err(HandlerError::already_exists(self.artifact_type, id, None));
        }
        if !options.dry_run {
            store.insert(id, artifact.clone());
        }
        Ok(Stored::new(artifact.clone()))
    }

    async fn read(&self, _root: &Path, id: &str, options: &ReadOptions) -> HandlerResult<Artifact> {
        let artifact = self
            .store
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| HandlerError::not_found(self.artifact_type, id))?;
        if options.include_content {
            Ok(Stored::new(artifact))
        } else {
            Ok(Stored::new(artifact.without_content()))
        }
    }

    async fn update(
        &self,
        _root: &Path,
        id: &str,
        changes: &ArtifactChanges,
        options: &UpdateOptions,
    ) -> HandlerResult<Artifact> {
        let mut store = self.store.lock();
        let current = store
            .get(id)
            .ok_or_else(|| HandlerError::not_found(self.artifact_type, id))?;
        let updated = current.apply_changes(changes, options.merge)?;
        updated.validate()?;

        if !options.dry_run {
            store.insert(id.to_string(), updated.clone());
        }
        Ok(Stored::new(updated))
    }

    async fn delete(&self, _root: &Path, id: &str, options: &DeleteOptions) -> HandlerResult<()> {
        let mut store = self.store.lock();
        if !store.contains_key(id) {
            return Err(HandlerError::not_found(self.artifact_type, id));
        }
        if options.dry_run {
            return Ok(Stored::new(()));
        }
        if let Some(removed) = store.remove(id) {
            if options.soft {
                self.trash.lock().push(removed);
            }
        }
        Ok(Stored::new(()))
    }

    async fn list(&self, _root: &Path) -> HandlerResult<Vec<Artifact>> {
        // BTreeMap iteration is already id-ordered
        Ok(Stored::new(self.store.lock().values().cloned().collect()))
    }
}
