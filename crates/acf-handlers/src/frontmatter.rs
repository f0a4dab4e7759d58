//! Markdown documents with YAML frontmatter
//!
//! ```text
//! ---
//! description: Review pull requests
//! tools:
//! - Read
//! ---
//!
//! Body text becomes the artifact's `content`.
//! ```

use serde_json::{Map, Value as JsonValue};

const FENCE: &str = "---";

/// Parsed document: frontmatter fields and body
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Document {
    pub(crate) fields: Map<String, JsonValue>,
    pub(crate) body: String,
}

/// Split off the frontmatter block, if the source opens with a fence
fn split(source: &str) -> Option<(&str, &str)> {
    let rest = source.strip_prefix(FENCE)?;
    let rest = rest
        .strip_prefix('\n')
        .or_else(|| rest.strip_prefix("\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Parse a markdown document
///
/// A source without a closing fence is treated as body only.
pub(crate) fn parse(source: &str) -> Result<Document, String> {
    let Some((yaml, body)) = split(source) else {
        return Ok(Document {
            fields: Map::new(),
            body: source.to_string(),
        });
    };

    let fields = if yaml.trim().is_empty() {
        Map::new()
    } else {
        match serde_yaml::from_str::<JsonValue>(yaml).map_err(|e| e.to_string())? {
            JsonValue::Object(map) => map,
            JsonValue::Null => Map::new(),
            other => return Err(format!("frontmatter must be a mapping, found {other}")),
        }
    };

    // one blank line separates the fence from the body
    let body = body
        .strip_prefix('\n')
        .or_else(|| body.strip_prefix("\r\n"))
        .unwrap_or(body);

    Ok(Document {
        fields,
        body: body.to_string(),
    })
}

/// Render a markdown document
///
/// Empty frontmatter is omitted unless the body itself opens with a fence,
/// in which case an empty block is written so the body parses back intact.
pub(crate) fn render(document: &Document) -> Result<String, String> {
    if document.fields.is_empty() {
        if document.body.starts_with(FENCE) {
            return Ok(format!("{FENCE}\n{FENCE}\n\n{}", document.body));
        }
        return Ok(document.body.clone());
    }
    let yaml = serde_yaml::to_string(&document.fields).map_err(|e| e.to_string())?;
    Ok(format!("{FENCE}\n{yaml}{FENCE}\n\n{}", document.body))
}
