//! Structural diff between artifact states
//!
//! Compares two [`ArtifactValue`]s by structure, never by identity:
//! - primitives by value
//! - arrays by length, then element-wise
//! - records by key set, then per key
//!
//! A `null` field and an absent field are the same thing. Values of
//! different shapes are simply unequal; nothing here fails.

use crate::value::{ArtifactValue, Record};
use serde::Serialize;
use std::collections::BTreeSet;

/// Field name used when the compared states are not records
pub const ROOT_FIELD: &str = "$root";

/// A single differing top-level field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    /// Field name
    pub field: String,
    /// Value before the change (`Null` when absent)
    pub old_value: ArtifactValue,
    /// Value after the change (`Null` when absent)
    pub new_value: ArtifactValue,
}

impl FieldChange {
    /// Create field change
    #[inline]
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        old_value: impl Into<ArtifactValue>,
        new_value: impl Into<ArtifactValue>,
    ) -> Self {
        Self {
            field: field.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }
}

/// Recursive structural equality
#[must_use]
pub fn structurally_equal(a: &ArtifactValue, b: &ArtifactValue) -> bool {
    match (a, b) {
        (ArtifactValue::Null, ArtifactValue::Null) => true,
        (ArtifactValue::Bool(x), ArtifactValue::Bool(y)) => x == y,
        (ArtifactValue::Integer(x), ArtifactValue::Integer(y)) => x == y,
        #[allow(clippy::float_cmp)]
        (ArtifactValue::Number(x), ArtifactValue::Number(y)) => x == y,
        (ArtifactValue::Integer(i), ArtifactValue::Number(f))
        | (ArtifactValue::Number(f), ArtifactValue::Integer(i)) => integral_float_equals(*f, *i),
        (ArtifactValue::String(x), ArtifactValue::String(y)) => x == y,
        (ArtifactValue::Array(xs), ArtifactValue::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| structurally_equal(x, y))
        }
        (ArtifactValue::Record(x), ArtifactValue::Record(y)) => records_equal(x, y),
        _ => false,
    }
}

/// `5.0 == 5`, compared without rounding the integer through `f64`
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn integral_float_equals(f: f64, i: i128) -> bool {
    f.fract() == 0.0 && f.abs() < i128::MAX as f64 && f as i128 == i
}

fn records_equal(x: &Record, y: &Record) -> bool {
    union_keys(x, y).into_iter().all(|key| {
        structurally_equal(field_or_null(x, key), field_or_null(y, key))
    })
}

fn union_keys<'a>(x: &'a Record, y: &'a Record) -> BTreeSet<&'a str> {
    x.keys().chain(y.keys()).map(String::as_str).collect()
}

fn field_or_null<'a>(record: &'a Record, key: &str) -> &'a ArtifactValue {
    static NULL: ArtifactValue = ArtifactValue::Null;
    record.get(key).unwrap_or(&NULL)
}

/// Compute the top-level fields that differ between two states
///
/// Fields are reported in sorted key order. `Null` on either side is
/// treated as an empty record, so diffing against a missing state reports
/// every populated field. Structurally identical inputs yield no changes.
#[must_use]
pub fn compute_field_changes(before: &ArtifactValue, after: &ArtifactValue) -> Vec<FieldChange> {
    let has_fields = |value: &ArtifactValue| {
        matches!(value, ArtifactValue::Record(_) | ArtifactValue::Null)
    };

    if !(has_fields(before) && has_fields(after)) {
        if structurally_equal(before, after) {
            return Vec::new();
        }
        return vec![FieldChange::new(ROOT_FIELD, before.clone(), after.clone())];
    }

    let empty = Record::new();
    let x = before.as_record().unwrap_or(&empty);
    let y = after.as_record().unwrap_or(&empty);
    union_keys(x, y)
        .into_iter()
        .filter_map(|key| {
            let old = field_or_null(x, key);
            let new = field_or_null(y, key);
            (!structurally_equal(old, new))
                .then(|| FieldChange::new(key, old.clone(), new.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn v(value: serde_json::Value) -> ArtifactValue {
        ArtifactValue::from(value)
    }

    #[test]
    fn reports_single_changed_field() {
        let before = v(json!({"name": "skill-a", "description": "Old"}));
        let after = v(json!({"name": "skill-a", "description": "New"}));

        let changes = compute_field_changes(&before, &after);
        assert_eq!(changes, vec![FieldChange::new("description", "Old", "New")]);
    }

    #[test]
    fn identical_states_have_no_changes() {
        let state = v(json!({"name": "x", "tools": ["a", {"b": [1, 2]}]}));
        assert!(compute_field_changes(&state, &state.clone()).is_empty());
    }

    #[test]
    fn null_equals_absent() {
        let before = v(json!({"name": "x", "model": null}));
        let after = v(json!({"name": "x"}));
        assert!(compute_field_changes(&before, &after).is_empty());
        assert!(structurally_equal(&before, &after));
    }

    #[test]
    fn added_and_removed_fields_are_changes() {
        let before = v(json!({"name": "x", "old": 1}));
        let after = v(json!({"name": "x", "new": true}));

        let changes = compute_field_changes(&before, &after);
        assert_eq!(
            changes,
            vec![
                FieldChange::new("new", ArtifactValue::Null, true),
                FieldChange::new("old", 1_i64, ArtifactValue::Null),
            ]
        );
    }

    #[test]
    fn arrays_compare_by_length_and_elements() {
        let a = v(json!([1, 2, 3]));
        assert!(!structurally_equal(&a, &v(json!([1, 2]))));
        assert!(!structurally_equal(&a, &v(json!([1, 2, 4]))));
        assert!(structurally_equal(&a, &v(json!([1.0, 2.0, 3.0]))));
    }

    #[test]
    fn large_integers_are_compared_exactly() {
        let before = v(json!({"timeout": 9_007_199_254_740_992_u64}));
        let after = v(json!({"timeout": 9_007_199_254_740_993_u64}));
        assert_eq!(
            compute_field_changes(&before, &after),
            vec![FieldChange::new(
                "timeout",
                9_007_199_254_740_992_u64,
                9_007_199_254_740_993_u64
            )]
        );
        assert!(!structurally_equal(&v(json!(u64::MAX)), &v(json!(u64::MAX - 1))));
    }

    #[test]
    fn shape_mismatch_is_a_change_not_an_error() {
        let before = v(json!({"tools": "Read"}));
        let after = v(json!({"tools": ["Read"]}));
        let changes = compute_field_changes(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "tools");
    }

    #[test]
    fn missing_state_reports_all_fields() {
        let after = v(json!({"name": "x", "content": "body"}));
        let changes = compute_field_changes(&ArtifactValue::Null, &after);
        let fields: Vec<_> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["content", "name"]);
    }

    #[test]
    fn non_record_states_diff_at_root() {
        let changes = compute_field_changes(&v(json!("a")), &v(json!("b")));
        assert_eq!(changes, vec![FieldChange::new(ROOT_FIELD, "a", "b")]);
        assert!(compute_field_changes(&v(json!(3)), &v(json!(3))).is_empty());
    }

    fn arb_value() -> impl Strategy<Value = ArtifactValue> {
        let leaf = prop_oneof![
            Just(ArtifactValue::Null),
            any::<bool>().prop_map(ArtifactValue::Bool),
            (-1_000_i64..1_000).prop_map(ArtifactValue::from),
            "[a-z]{0,8}".prop_map(ArtifactValue::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(ArtifactValue::Array),
                proptest::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(ArtifactValue::Record),
            ]
        })
    }

    proptest! {
        #[test]
        fn diff_is_reflexive(value in arb_value()) {
            prop_assert!(compute_field_changes(&value, &value.clone()).is_empty());
            prop_assert!(structurally_equal(&value, &value));
        }
    }
}
