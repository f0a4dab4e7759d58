//! Artifact Type Enumeration
//!
//! The closed set of configuration artifact kinds managed by the workspace.
//! Every handler registry, subscription key and history entry is keyed by
//! one of these variants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of configuration artifact
///
/// The string form (`skill`, `sub-agent`, ...) is shared by `Display`,
/// `FromStr` and serde.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactType {
    /// Reusable skill (`category/name`)
    Skill,
    /// Lifecycle hook command
    Hook,
    /// Delegated sub-agent definition
    SubAgent,
    /// Project rule / memory file
    Rule,
    /// Top-level agent definition
    Agent,
    /// Slash command
    Command,
    /// MCP server definition
    McpServer,
}

impl ArtifactType {
    /// All artifact types in declaration order
    pub const ALL: [ArtifactType; 7] = [
        ArtifactType::Skill,
        ArtifactType::Hook,
        ArtifactType::SubAgent,
        ArtifactType::Rule,
        ArtifactType::Agent,
        ArtifactType::Command,
        ArtifactType::McpServer,
    ];

    /// Stable string identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Skill => "skill",
            ArtifactType::Hook => "hook",
            ArtifactType::SubAgent => "sub-agent",
            ArtifactType::Rule => "rule",
            ArtifactType::Agent => "agent",
            ArtifactType::Command => "command",
            ArtifactType::McpServer => "mcp-server",
        }
    }

    /// Whether identity is composite (`category/name`)
    #[inline]
    #[must_use]
    pub fn has_composite_id(&self) -> bool {
        matches!(self, ArtifactType::Skill)
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing an artifact type name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown artifact type: '{0}'")]
pub struct UnknownArtifactType(pub String);

impl FromStr for ArtifactType {
    type Err = UnknownArtifactType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownArtifactType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        for ty in ArtifactType::ALL {
            let parsed: ArtifactType = ty.to_string().parse().unwrap();
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&ArtifactType::McpServer).unwrap();
        assert_eq!(json, "\"mcp-server\"");

        let back: ArtifactType = serde_json::from_str("\"sub-agent\"").unwrap();
        assert_eq!(back, ArtifactType::SubAgent);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = "plugin".parse::<ArtifactType>().unwrap_err();
        assert!(err.to_string().contains("plugin"));
    }

    #[test]
    fn only_skills_have_composite_ids() {
        assert!(ArtifactType::Skill.has_composite_id());
        assert!(!ArtifactType::Hook.has_composite_id());
    }
}
