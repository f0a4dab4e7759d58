//! Bounded operation history
//!
//! Entries are appended after successful mutations and evicted oldest-first
//! once capacity is exceeded. Entries are never edited.

use crate::result::OperationResult;
use crate::snapshot::Snapshot;
use acf_artifact::{Artifact, ArtifactChanges, ArtifactType};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::fmt;
use ulid::Ulid;

/// Engine operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl OperationKind {
    /// Lower-case name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What was requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub artifact_type: ArtifactType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    /// Options as passed, serialized
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub options: JsonValue,
    /// Requested changes (updates only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<ArtifactChanges>,
}

impl OperationDescriptor {
    /// Describe an operation on one artifact
    #[must_use]
    pub fn new(kind: OperationKind, artifact_type: ArtifactType, artifact_id: impl Into<String>) -> Self {
        Self {
            kind,
            artifact_type,
            artifact_id: Some(artifact_id.into()),
            options: JsonValue::Null,
            changes: None,
        }
    }

    /// With serialized options
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: impl Serialize) -> Self {
        self.options = serde_json::to_value(options).unwrap_or_default();
        self
    }

    /// With requested changes
    #[inline]
    #[must_use]
    pub fn with_changes(mut self, changes: &ArtifactChanges) -> Self {
        self.changes = Some(changes.clone());
        self
    }
}

/// One retained mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub operation_id: Ulid,
    pub operation_descriptor: OperationDescriptor,
    /// Resulting state; `None` for deletes
    pub result: OperationResult<Option<Artifact>>,
    pub before_snapshot: Snapshot,
    pub after_snapshot: Snapshot,
    pub timestamp: DateTime<Utc>,
}

/// Capacity-bounded FIFO of [`HistoryEntry`]
#[derive(Debug)]
pub struct OperationHistory {
    capacity: usize,
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl OperationHistory {
    /// Create history retaining at most `capacity` entries
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Append, evicting the oldest entries beyond capacity
    pub fn add(&self, entry: HistoryEntry) {
        let mut entries = self.entries.lock();
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// All retained entries, oldest first
    #[must_use]
    pub fn get_all(&self) -> Vec<HistoryEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Up to `n` entries, most recent first
    #[must_use]
    pub fn get_recent(&self, n: usize) -> Vec<HistoryEntry> {
        self.entries.lock().iter().rev().take(n).cloned().collect()
    }

    /// Find an entry by operation id
    #[must_use]
    pub fn find(&self, operation_id: Ulid) -> Option<HistoryEntry> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.operation_id == operation_id)
            .cloned()
    }

    /// Number of retained entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
