//! Artifact payloads and identity
//!
//! One struct per [`ArtifactType`] plus the [`Artifact`] union that the
//! engine and handlers pass around. Identity is always derived from the
//! payload's own fields, never stored separately:
//! - skills: `category/name`
//! - everything else: `name`, or an explicit string `id` when `name` is empty

use crate::artifact_type::ArtifactType;
use crate::value::ArtifactValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// Unrecognised fields kept verbatim (frontmatter extras, vendor keys)
pub type Extra = Map<String, JsonValue>;

/// Errors related to artifact payloads
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArtifactError {
    /// Identity cannot be derived or is malformed
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Field violates a payload invariant
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// Variant does not match the requested type
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: ArtifactType,
        actual: ArtifactType,
    },

    /// An update attempted to rename the artifact
    #[error("identity change not supported: {from} -> {to}")]
    IdentityChanged { from: String, to: String },

    /// Payload could not be (de)serialized
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ArtifactError {
    /// Create invalid field error
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Reusable skill, stored under its category
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Skill {
    /// Create skill with body content
    #[must_use]
    pub fn new(category: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Lifecycle hook bound to an agent event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    #[serde(default)]
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Hook {
    /// Create hook running `command` on `event`
    #[must_use]
    pub fn new(name: impl Into<String>, event: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event: event.into(),
            command: command.into(),
            ..Self::default()
        }
    }

    /// With tool matcher
    #[inline]
    #[must_use]
    pub fn with_matcher(mut self, matcher: impl Into<String>) -> Self {
        self.matcher = Some(matcher.into());
        self
    }
}

/// Delegated sub-agent definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubAgent {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl SubAgent {
    /// Create sub-agent with system prompt
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Project rule
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Rule {
    /// Create rule with body
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Top-level agent definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Agent {
    /// Create agent with instructions
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Slash command
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Command {
    /// Create command with prompt template
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// MCP server definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServer {
    #[serde(default)]
    pub name: String,
    /// Transport kind (`stdio`, `http`, `sse`)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl McpServer {
    /// Create stdio server launched by `command`
    #[must_use]
    pub fn stdio(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: Some("stdio".to_string()),
            command: Some(command.into()),
            ..Self::default()
        }
    }

    /// Create HTTP server at `url`
    #[must_use]
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: Some("http".to_string()),
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// Any configuration artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "artifactType", rename_all = "kebab-case")]
pub enum Artifact {
    Skill(Skill),
    Hook(Hook),
    SubAgent(SubAgent),
    Rule(Rule),
    Agent(Agent),
    Command(Command),
    McpServer(McpServer),
}

/// Name if set, otherwise the explicit `id` extra field
fn name_or_explicit_id(name: &str, extra: &Extra) -> String {
    if name.is_empty() {
        extra
            .get("id")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string()
    } else {
        name.to_string()
    }
}

/// Split a skill identity into `(category, name)`
///
/// # Errors
/// Returns error if the id has no `/` or either half is empty
pub fn split_skill_id(id: &str) -> Result<(&str, &str), ArtifactError> {
    match id.split_once('/') {
        Some((category, name)) if !category.is_empty() && !name.is_empty() => Ok((category, name)),
        _ => Err(ArtifactError::InvalidIdentity(format!(
            "skill id must be 'category/name', got '{id}'"
        ))),
    }
}

/// Reject identity segments that would escape their directory
fn check_segment(field: &str, value: &str) -> Result<(), ArtifactError> {
    if value.is_empty() {
        return Err(ArtifactError::invalid_field(field, "must not be empty"));
    }
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(ArtifactError::invalid_field(field, "must be a single path segment"));
    }
    Ok(())
}

impl Artifact {
    /// Artifact kind
    #[inline]
    #[must_use]
    pub fn artifact_type(&self) -> ArtifactType {
        match self {
            Self::Skill(_) => ArtifactType::Skill,
            Self::Hook(_) => ArtifactType::Hook,
            Self::SubAgent(_) => ArtifactType::SubAgent,
            Self::Rule(_) => ArtifactType::Rule,
            Self::Agent(_) => ArtifactType::Agent,
            Self::Command(_) => ArtifactType::Command,
            Self::McpServer(_) => ArtifactType::McpServer,
        }
    }

    /// Derived identity
    ///
    /// Pure function of the payload; empty when nothing identifies it.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Self::Skill(s) => format!("{}/{}", s.category, s.name),
            Self::Hook(h) => name_or_explicit_id(&h.name, &h.extra),
            Self::SubAgent(a) => name_or_explicit_id(&a.name, &a.extra),
            Self::Rule(r) => name_or_explicit_id(&r.name, &r.extra),
            Self::Agent(a) => name_or_explicit_id(&a.name, &a.extra),
            Self::Command(c) => name_or_explicit_id(&c.name, &c.extra),
            Self::McpServer(m) => name_or_explicit_id(&m.name, &m.extra),
        }
    }

    /// Markdown body, for types that have one
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Skill(s) => Some(&s.content),
            Self::SubAgent(a) => Some(&a.content),
            Self::Rule(r) => Some(&r.content),
            Self::Agent(a) => Some(&a.content),
            Self::Command(c) => Some(&c.content),
            Self::Hook(_) | Self::McpServer(_) => None,
        }
    }

    /// Same artifact with the body blanked
    #[must_use]
    pub fn without_content(mut self) -> Self {
        match &mut self {
            Self::Skill(s) => s.content.clear(),
            Self::SubAgent(a) => a.content.clear(),
            Self::Rule(r) => r.content.clear(),
            Self::Agent(a) => a.content.clear(),
            Self::Command(c) => c.content.clear(),
            Self::Hook(_) | Self::McpServer(_) => {}
        }
        self
    }

    /// Fields that make up identity and survive a replacing update
    #[must_use]
    pub fn identity_fields(artifact_type: ArtifactType) -> &'static [&'static str] {
        if artifact_type.has_composite_id() {
            &["category", "name"]
        } else {
            &["name", "id"]
        }
    }

    /// Check payload invariants
    ///
    /// # Errors
    /// Returns the first violated invariant
    pub fn validate(&self) -> Result<(), ArtifactError> {
        match self {
            Self::Skill(s) => {
                check_segment("category", &s.category)?;
                check_segment("name", &s.name)?;
            }
            Self::Hook(h) => {
                check_segment("name", &self.id())?;
                if h.event.trim().is_empty() {
                    return Err(ArtifactError::invalid_field("event", "must not be empty"));
                }
                if h.command.trim().is_empty() {
                    return Err(ArtifactError::invalid_field("command", "must not be empty"));
                }
            }
            Self::McpServer(m) => {
                check_segment("name", &self.id())?;
                if m.command.is_none() && m.url.is_none() {
                    return Err(ArtifactError::invalid_field(
                        "command",
                        "either command or url is required",
                    ));
                }
            }
            Self::SubAgent(_) | Self::Rule(_) | Self::Agent(_) | Self::Command(_) => {
                check_segment("name", &self.id())?;
            }
        }
        Ok(())
    }

    /// Payload as JSON (without the type tag)
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        // string-keyed structs cannot fail to serialize
        let value = match self {
            Self::Skill(s) => serde_json::to_value(s),
            Self::Hook(h) => serde_json::to_value(h),
            Self::SubAgent(a) => serde_json::to_value(a),
            Self::Rule(r) => serde_json::to_value(r),
            Self::Agent(a) => serde_json::to_value(a),
            Self::Command(c) => serde_json::to_value(c),
            Self::McpServer(m) => serde_json::to_value(m),
        };
        value.unwrap_or_default()
    }

    /// Payload as a closed structural value
    #[inline]
    #[must_use]
    pub fn to_value(&self) -> ArtifactValue {
        ArtifactValue::from(self.to_json())
    }

    /// Build an artifact of `artifact_type` from an untagged JSON payload
    ///
    /// # Errors
    /// Returns error if the payload does not fit the type's shape
    pub fn from_json(artifact_type: ArtifactType, value: JsonValue) -> Result<Self, ArtifactError> {
        let err = |e: serde_json::Error| ArtifactError::Serialization(e.to_string());
        Ok(match artifact_type {
            ArtifactType::Skill => Self::Skill(serde_json::from_value(value).map_err(err)?),
            ArtifactType::Hook => Self::Hook(serde_json::from_value(value).map_err(err)?),
            ArtifactType::SubAgent => Self::SubAgent(serde_json::from_value(value).map_err(err)?),
            ArtifactType::Rule => Self::Rule(serde_json::from_value(value).map_err(err)?),
            ArtifactType::Agent => Self::Agent(serde_json::from_value(value).map_err(err)?),
            ArtifactType::Command => Self::Command(serde_json::from_value(value).map_err(err)?),
            ArtifactType::McpServer => Self::McpServer(serde_json::from_value(value).map_err(err)?),
        })
    }

    /// Apply a partial update
    ///
    /// With `merge`, changes overlay the current fields and a `null` change
    /// removes the field. Without it, only identity fields are carried over.
    ///
    /// # Errors
    /// - `ArtifactError::IdentityChanged` if the changes rename the artifact
    /// - `ArtifactError::Serialization` if the result does not fit the type
    pub fn apply_changes(&self, changes: &ArtifactChanges, merge: bool) -> Result<Self, ArtifactError> {
        let ty = self.artifact_type();
        let mut fields = match self.to_json() {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };

        if !merge {
            let keep = Self::identity_fields(ty);
            fields.retain(|key, _| keep.contains(&key.as_str()));
        }

        for (key, value) in changes.iter() {
            if value.is_null() {
                fields.remove(key);
            } else {
                fields.insert(key.clone(), value.clone());
            }
        }

        let updated = Self::from_json(ty, JsonValue::Object(fields))?;
        let (from, to) = (self.id(), updated.id());
        if from != to {
            return Err(ArtifactError::IdentityChanged { from, to });
        }
        Ok(updated)
    }
}

/// Partial update payload: top-level field -> new value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactChanges(Map<String, JsonValue>);

impl ArtifactChanges {
    /// Create empty change set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set field value
    #[inline]
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Remove field (applied as `null`)
    #[inline]
    #[must_use]
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.0.insert(field.into(), JsonValue::Null);
        self
    }

    /// Value staged for `field`
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.0.get(field)
    }

    /// Iterate staged changes
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }

    /// Number of staged fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no fields are staged
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, JsonValue>> for ArtifactChanges {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

/// Link between a payload struct and its [`ArtifactType`]
///
/// Lets the engine expose narrow, type-checked operations
/// (`create_skill`, `read_hook`, ...) over the generic ones.
pub trait TypedArtifact: Clone + Into<Artifact> + Send + Sync + 'static {
    /// Artifact kind of this payload
    const TYPE: ArtifactType;

    /// Unwrap the matching variant
    ///
    /// # Errors
    /// Returns `ArtifactError::TypeMismatch` for any other variant
    fn from_artifact(artifact: Artifact) -> Result<Self, ArtifactError>;
}

macro_rules! typed_artifact {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl From<$variant> for Artifact {
                fn from(inner: $variant) -> Self {
                    Artifact::$variant(inner)
                }
            }

            impl TypedArtifact for $variant {
                const TYPE: ArtifactType = ArtifactType::$variant;

                fn from_artifact(artifact: Artifact) -> Result<Self, ArtifactError> {
                    match artifact {
                        Artifact::$variant(inner) => Ok(inner),
                        other => Err(ArtifactError::TypeMismatch {
                            expected: Self::TYPE,
                            actual: other.artifact_type(),
                        }),
                    }
                }
            }
        )+
    };
}

typed_artifact!(Skill, Hook, SubAgent, Rule, Agent, Command, McpServer);
