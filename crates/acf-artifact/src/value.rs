//! Closed recursive value model
//!
//! [`ArtifactValue`] is the shape every artifact state is reduced to before
//! structural comparison. Keeping the variant set closed keeps the diff
//! exhaustive: primitives, arrays and records, nothing else.

use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Record body (sorted keys for deterministic iteration)
pub type Record = BTreeMap<String, ArtifactValue>;

/// Primitive, array or record value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ArtifactValue {
    /// Absent / null
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integral number, exact across the whole `i64` and `u64` ranges
    Integer(i128),
    /// Non-integral number
    Number(f64),
    /// String
    String(String),
    /// Ordered list
    Array(Vec<ArtifactValue>),
    /// Keyed record
    Record(Record),
}

impl ArtifactValue {
    /// Check for null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow as record
    #[inline]
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Field lookup on a record (None for non-records)
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ArtifactValue> {
        self.as_record().and_then(|map| map.get(key))
    }

    /// Convert back to a JSON value
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Integer(n) => integer_to_json(*n),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Array(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            Self::Record(map) => JsonValue::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

fn integer_to_json(n: i128) -> JsonValue {
    if let Ok(n) = i64::try_from(n) {
        JsonValue::from(n)
    } else if let Ok(n) = u64::try_from(n) {
        JsonValue::from(n)
    } else {
        #[allow(clippy::cast_precision_loss)]
        number_to_json(n as f64)
    }
}

/// Integral floats go back out as integers so `5` does not become `5.0`
fn number_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        #[allow(clippy::cast_possible_truncation)]
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
    }
}

impl From<JsonValue> for ArtifactValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => n
                .as_i64()
                .map(i128::from)
                .or_else(|| n.as_u64().map(i128::from))
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Number))
                .unwrap_or(Self::Null),
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            JsonValue::Object(map) => {
                Self::Record(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for ArtifactValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ArtifactValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ArtifactValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ArtifactValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for ArtifactValue {
    fn from(value: i64) -> Self {
        Self::Integer(i128::from(value))
    }
}

impl From<u64> for ArtifactValue {
    fn from(value: u64) -> Self {
        Self::Integer(i128::from(value))
    }
}

impl Serialize for ArtifactValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_nested_json() {
        let value = ArtifactValue::from(json!({
            "name": "x",
            "tools": ["Read", "Write"],
            "nested": {"enabled": true, "timeout": 30}
        }));

        assert_eq!(value.get("name"), Some(&ArtifactValue::from("x")));
        assert_eq!(
            value.get("tools"),
            Some(&ArtifactValue::Array(vec!["Read".into(), "Write".into()]))
        );
        assert_eq!(
            value.get("nested").and_then(|n| n.get("timeout")),
            Some(&ArtifactValue::Integer(30))
        );
        assert_eq!(
            ArtifactValue::from(json!(0.5)),
            ArtifactValue::Number(0.5)
        );
    }

    #[test]
    fn integral_numbers_serialize_as_integers() {
        let value = ArtifactValue::from(json!({"timeout": 30, "ratio": 0.5}));
        let out = serde_json::to_string(&value).unwrap();
        assert_eq!(out, r#"{"ratio":0.5,"timeout":30}"#);
    }

    #[test]
    fn large_integers_survive_unchanged() {
        let big = ArtifactValue::from(json!(u64::MAX));
        assert_eq!(big, ArtifactValue::Integer(i128::from(u64::MAX)));
        assert_eq!(big.to_json(), json!(u64::MAX));

        let near = ArtifactValue::from(json!(9_007_199_254_740_993_i64));
        assert_eq!(near.to_json(), json!(9_007_199_254_740_993_i64));
    }

    #[test]
    fn get_on_non_record_is_none() {
        assert!(ArtifactValue::from("text").get("x").is_none());
        assert!(ArtifactValue::Null.get("x").is_none());
    }
}
