//! ACF Artifact Model
//!
//! Typed agent-configuration artifacts and the structural diff used to
//! version them.
//!
//! # Core Concepts
//!
//! - [`ArtifactType`]: closed set of kinds (skill, hook, sub-agent, rule,
//!   agent, command, MCP server)
//! - [`Artifact`]: union of the seven payload structs, with derived identity
//! - [`ArtifactChanges`]: partial update payload
//! - [`ArtifactValue`]: closed recursive value used for comparison
//! - [`compute_field_changes`]: top-level structural diff
//!
//! # Example
//!
//! ```rust
//! use acf_artifact::{compute_field_changes, Artifact, ArtifactChanges, Skill};
//!
//! let before: Artifact = Skill::new("core", "example", "body")
//!     .with_description("A")
//!     .into();
//! let after = before
//!     .apply_changes(&ArtifactChanges::new().set("description", "B"), true)
//!     .unwrap();
//!
//! assert_eq!(after.id(), "core/example");
//! let changes = compute_field_changes(&before.to_value(), &after.to_value());
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes[0].field, "description");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod artifact_type;
mod diff;
mod value;

pub use artifact::{
    split_skill_id, Agent, Artifact, ArtifactChanges, ArtifactError, Command, Extra, Hook,
    McpServer, Rule, Skill, SubAgent, TypedArtifact,
};
pub use artifact_type::{ArtifactType, UnknownArtifactType};
pub use diff::{compute_field_changes, structurally_equal, FieldChange, ROOT_FIELD};
pub use value::{ArtifactValue, Record};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
