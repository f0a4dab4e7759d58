//! ACF Handlers
//!
//! Per-type persistence for agent-configuration artifacts.
//!
//! # Core Concepts
//!
//! - [`ArtifactHandler`]: async CRUD contract, one implementation per type
//! - [`MarkdownHandler`]: markdown + YAML frontmatter files
//! - [`JsonCollectionHandler`]: keyed entries in a shared JSON file
//! - [`MemoryHandler`]: map-backed store for tests and embedding
//!
//! Handlers report failures as [`HandlerError`] values. Logging, history
//! and change notification belong to the engine that drives them.
//!
//! # Example
//!
//! ```rust,no_run
//! use acf_artifact::{Artifact, Rule};
//! use acf_handlers::{ArtifactHandler, CreateOptions, MarkdownHandler};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), acf_handlers::HandlerError> {
//! let rules = MarkdownHandler::rules();
//! let rule: Artifact = Rule::new("testing", "Always run tests.\n").into();
//! let stored = rules
//!     .create(Path::new("."), &rule, &CreateOptions::new())
//!     .await?;
//! assert!(stored.path.is_some());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod collection;
mod error;
mod frontmatter;
mod handler;
mod markdown;
mod memory;
pub mod trash;

pub use collection::JsonCollectionHandler;
pub use error::HandlerError;
pub use handler::{
    ensure_type, ArtifactHandler, CreateOptions, DeleteOptions, HandlerResult, ReadOptions,
    Stored, UpdateOptions,
};
pub use markdown::{MarkdownHandler, SKILL_FILE};
pub use memory::{memory_handlers, MemoryHandler};

use std::sync::Arc;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Filesystem handlers for every artifact type
#[must_use]
pub fn default_handlers() -> Vec<Arc<dyn ArtifactHandler>> {
    vec![
        Arc::new(MarkdownHandler::skills()),
        Arc::new(JsonCollectionHandler::hooks()),
        Arc::new(MarkdownHandler::sub_agents()),
        Arc::new(MarkdownHandler::rules()),
        Arc::new(MarkdownHandler::agents()),
        Arc::new(MarkdownHandler::commands()),
        Arc::new(JsonCollectionHandler::mcp_servers()),
    ]
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use acf_artifact::{Artifact, ArtifactType, Hook, Skill};
    use std::collections::BTreeSet;

    #[test]
    fn default_handlers_cover_every_type_once() {
        let types: BTreeSet<ArtifactType> = default_handlers()
            .iter()
            .map(|h| h.artifact_type())
            .collect();
        assert_eq!(types.len(), ArtifactType::ALL.len());
    }

    #[tokio::test]
    async fn handlers_share_one_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let skill: Artifact = Skill::new("core", "x", "body").into();
        let hook: Artifact = Hook::new("fmt", "PostToolUse", "cargo fmt").into();

        for artifact in [&skill, &hook] {
            let handler = default_handlers()
                .into_iter()
                .find(|h| h.artifact_type() == artifact.artifact_type())
                .unwrap();
            handler
                .create(dir.path(), artifact, &CreateOptions::new())
                .await
                .unwrap();
        }

        assert!(dir.path().join(".claude/skills/core/x/SKILL.md").exists());
        assert!(dir.path().join(".claude/hooks.json").exists());
    }
}
