//! Aggregated JSON collections
//!
//! Hooks and MCP servers live as entries of one JSON object inside a shared
//! file, keyed by id:
//!
//! ```json
//! { "mcpServers": { "docs": { "type": "http", "url": "https://..." } } }
//! ```
//!
//! Entries are stored without their `name` (the key carries it). Other
//! top-level keys of the file are preserved on write.

use crate::error::HandlerError;
use crate::handler::{
    ensure_type, ArtifactHandler, CreateOptions, DeleteOptions, HandlerResult, ReadOptions,
    Stored, UpdateOptions,
};
use crate::trash;
use acf_artifact::{Artifact, ArtifactChanges, ArtifactType};
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Handler for one keyed collection in a JSON file
#[derive(Debug, Clone)]
pub struct JsonCollectionHandler {
    artifact_type: ArtifactType,
    file: PathBuf,
    key: &'static str,
}

/// Whole file plus the collection it holds
struct Collection {
    document: Map<String, JsonValue>,
    entries: Map<String, JsonValue>,
}

impl JsonCollectionHandler {
    /// Hooks in `.claude/hooks.json` under `hooks`
    #[must_use]
    pub fn hooks() -> Self {
        Self {
            artifact_type: ArtifactType::Hook,
            file: PathBuf::from(".claude/hooks.json"),
            key: "hooks",
        }
    }

    /// MCP servers in `.mcp.json` under `mcpServers`
    #[must_use]
    pub fn mcp_servers() -> Self {
        Self {
            artifact_type: ArtifactType::McpServer,
            file: PathBuf::from(".mcp.json"),
            key: "mcpServers",
        }
    }

    /// Backing file, relative to the project root
    #[inline]
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    async fn load(&self, root: &Path) -> Result<(Collection, PathBuf), HandlerError> {
        let path = root.join(&self.file);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let empty = Collection {
                    document: Map::new(),
                    entries: Map::new(),
                };
                return Ok((empty, path));
            }
            Err(e) => return Err(HandlerError::io_error(&path, e)),
        };

        let mut document = match serde_json::from_str::<JsonValue>(&text) {
            Ok(JsonValue::Object(map)) => map,
            Ok(_) => return Err(HandlerError::parse_error(&path, "top level must be an object")),
            Err(e) => return Err(HandlerError::parse_error(&path, e.to_string())),
        };
        let entries = match document.remove(self.key) {
            Some(JsonValue::Object(map)) => map,
            None | Some(JsonValue::Null) => Map::new(),
            Some(_) => {
                return Err(HandlerError::parse_error(
                    &path,
                    format!("'{}' must be an object", self.key),
                ))
            }
        };
        Ok((Collection { document, entries }, path))
    }

    async fn save(&self, path: &Path, collection: Collection) -> Result<(), HandlerError> {
        let Collection {
            mut document,
            entries,
        } = collection;
        document.insert(self.key.to_string(), JsonValue::Object(entries));

        let mut text = serde_json::to_string_pretty(&JsonValue::Object(document))
            .map_err(|e| HandlerError::Serialization(e.to_string()))?;
        text.push('\n');

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HandlerError::io_error(parent, e))?;
        }
        tokio::fs::write(path, text)
            .await
            .map_err(|e| HandlerError::io_error(path, e))
    }

    /// Entry body for storage
    ///
    /// The name moves into the key unless an explicit `id` already carries
    /// the identity, in which case the entry is stored as is.
    fn to_entry(artifact: &Artifact) -> JsonValue {
        let key = artifact.id();
        let mut value = artifact.to_json();
        if let JsonValue::Object(map) = &mut value {
            let explicit_id = map.get("id").and_then(JsonValue::as_str) == Some(key.as_str());
            if !explicit_id {
                map.remove("name");
            }
        }
        value
    }

    fn from_entry(&self, id: &str, entry: &JsonValue, path: &Path) -> Result<Artifact, HandlerError> {
        let JsonValue::Object(map) = entry else {
            return Err(HandlerError::parse_error(
                path,
                format!("entry '{id}' must be an object"),
            ));
        };
        let mut fields = map.clone();
        let explicit_id = fields.get("id").and_then(JsonValue::as_str) == Some(id);
        if !explicit_id {
            fields.insert("name".to_string(), id.into());
        }
        Artifact::from_json(self.artifact_type, JsonValue::Object(fields))
            .map_err(|e| HandlerError::parse_error(path, e.to_string()))
    }

    fn lookup(
        &self,
        collection: &Collection,
        id: &str,
        path: &Path,
    ) -> Result<Artifact, HandlerError> {
        let entry = collection
            .entries
            .get(id)
            .ok_or_else(|| HandlerError::not_found(self.artifact_type, id))?;
        self.from_entry(id, entry, path)
    }
}

#[async_trait]
impl ArtifactHandler for JsonCollectionHandler {
    fn artifact_type(&self) -> ArtifactType {
        self.artifact_type
    }

    async fn create(
        &self,
        root: &Path,
        artifact: &Artifact,
        options: &CreateOptions,
    ) -> HandlerResult<Artifact> {
        ensure_type(self.artifact_type, artifact)?;
        artifact.validate()?;

        let id = artifact.id();
        let (mut collection, path) = self.load(root).await?;
        if collection.entries.contains_key(&id) && !options.overwrite {
            return Err(HandlerError::already_exists(self.artifact_type, id, Some(path)));
        }

        if !options.dry_run {
            collection.entries.insert(id, Self::to_entry(artifact));
            self.save(&path, collection).await?;
        }
        Ok(Stored::at(artifact.clone(), path))
    }

    async fn read(&self, root: &Path, id: &str, _options: &ReadOptions) -> HandlerResult<Artifact> {
        let (collection, path) = self.load(root).await?;
        let artifact = self.lookup(&collection, id, &path)?;
        Ok(Stored::at(artifact, path))
    }

    async fn update(
        &self,
        root: &Path,
        id: &str,
        changes: &ArtifactChanges,
        options: &UpdateOptions,
    ) -> HandlerResult<Artifact> {
        let (mut collection, path) = self.load(root).await?;
        let current = self.lookup(&collection, id, &path)?;
        let updated = current.apply_changes(changes, options.merge)?;
        updated.validate()?;

        if !options.dry_run {
            collection.entries.insert(id.to_string(), Self::to_entry(&updated));
            self.save(&path, collection).await?;
        }
        Ok(Stored::at(updated, path))
    }

    async fn delete(&self, root: &Path, id: &str, options: &DeleteOptions) -> HandlerResult<()> {
        let (mut collection, path) = self.load(root).await?;
        let current = self.lookup(&collection, id, &path)?;
        if options.dry_run {
            return Ok(Stored::at((), path));
        }
        if options.soft {
            trash::stash(root, &current).await?;
        }

        collection.entries.remove(id);
        self.save(&path, collection).await?;
        Ok(Stored::at((), path))
    }

    async fn list(&self, root: &Path) -> HandlerResult<Vec<Artifact>> {
        let (collection, path) = self.load(root).await?;
        let mut artifacts = Vec::with_capacity(collection.entries.len());
        for (id, entry) in &collection.entries {
            match self.from_entry(id, entry, &path) {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => tracing::warn!("skipping unreadable {} '{}': {}", self.artifact_type, id, e),
            }
        }
        artifacts.sort_by_key(Artifact::id);
        Ok(Stored::at(artifacts, path))
    }
}
