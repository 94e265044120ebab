// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical JSON and JSONL serialization.
//!
//! `logHash` and `manifestHash` must not depend on the writer's
//! key-insertion order, so every byte that ends up under a hash goes
//! through [`canonicalize`]: object keys sorted ascending by code unit,
//! standard escapes, finite numbers only, arrays in order, no whitespace.
//!
//! The sort is performed explicitly rather than relying on the map
//! representation, so the output is stable even if some dependency turns
//! on `serde_json`'s `preserve_order` feature.

use serde::Serialize;
use serde_json::Value;

/// Errors from canonical serialization.
#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    /// The input contained a NaN or infinite number.
    #[error("non-finite number is not JSON-compatible")]
    NonFiniteNumber,
    /// JSON serialization failed (map keys that are not strings, etc.).
    #[error("failed to serialize JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Produce the unique canonical string for a JSON value.
///
/// # Errors
///
/// Returns [`CanonError::Serialize`] if a scalar fails to serialize.
///
/// # Examples
///
/// ```
/// use serde_json::json;
///
/// let v = json!({"b": 1, "a": [2, {"z": null, "y": "s"}]});
/// assert_eq!(
///     arena_core::canonicalize(&v).unwrap(),
///     r#"{"a":[2,{"y":"s","z":null}],"b":1}"#
/// );
/// ```
pub fn canonicalize(value: &Value) -> Result<String, CanonError> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

/// Canonicalize a slice of values as JSONL: one line per value, `\n`
/// separators, and a single trailing `\n`.
///
/// # Errors
///
/// Returns the first [`CanonError`] encountered.
pub fn canonicalize_jsonl(values: &[Value]) -> Result<String, CanonError> {
    let mut out = String::new();
    for value in values {
        write_canonical(value, &mut out)?;
        out.push('\n');
    }
    Ok(out)
}

/// Convert any serializable input to a [`Value`] suitable for
/// canonicalization.
///
/// `Value` itself cannot represent non-finite numbers, so rejection of
/// NaN/infinity must happen at this conversion boundary: callers that
/// admit floating-point inputs (scores, custom feedback) are expected to
/// have validated finiteness with [`finite`] before the values reach
/// serialization, because `serde_json` silently maps non-finite floats
/// to `null`.
///
/// # Errors
///
/// Returns [`CanonError::Serialize`] if the value cannot be converted.
pub fn to_canonical_value<T: Serialize>(value: &T) -> Result<Value, CanonError> {
    Ok(serde_json::to_value(value)?)
}

/// Validate that a float is JSON-compatible.
///
/// # Errors
///
/// Returns [`CanonError::NonFiniteNumber`] for NaN or infinity.
pub fn finite(f: f64) -> Result<f64, CanonError> {
    if f.is_finite() {
        Ok(f)
    } else {
        Err(CanonError::NonFiniteNumber)
    }
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), CanonError> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                // Key came from the map, so the value is always present.
                if let Some(v) = map.get(*key) {
                    write_canonical(v, out)?;
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted() {
        let v = json!({"zebra": 1, "apple": 2, "mango": 3});
        assert_eq!(
            canonicalize(&v).unwrap(),
            r#"{"apple":2,"mango":3,"zebra":1}"#
        );
    }

    #[test]
    fn nested_objects_are_sorted_recursively() {
        let v = json!({"outer": {"b": {"d": 1, "c": 2}, "a": 3}});
        assert_eq!(
            canonicalize(&v).unwrap(),
            r#"{"outer":{"a":3,"b":{"c":2,"d":1}}}"#
        );
    }

    #[test]
    fn arrays_preserve_order() {
        let v = json!([3, 1, 2]);
        assert_eq!(canonicalize(&v).unwrap(), "[3,1,2]");
    }

    #[test]
    fn strings_are_escaped() {
        let v = json!({"s": "line\nbreak \"quoted\""});
        assert_eq!(
            canonicalize(&v).unwrap(),
            r#"{"s":"line\nbreak \"quoted\""}"#
        );
    }

    #[test]
    fn no_trailing_whitespace() {
        let v = json!({"a": [1, 2], "b": {"c": true}});
        let s = canonicalize(&v).unwrap();
        assert!(!s.contains(' '));
        assert!(!s.ends_with('\n'));
    }

    #[test]
    fn jsonl_has_single_trailing_newline() {
        let lines = vec![json!({"seq": 0}), json!({"seq": 1})];
        let s = canonicalize_jsonl(&lines).unwrap();
        assert_eq!(s, "{\"seq\":0}\n{\"seq\":1}\n");
    }

    #[test]
    fn empty_jsonl_is_empty_string() {
        assert_eq!(canonicalize_jsonl(&[]).unwrap(), "");
    }

    #[test]
    fn finite_rejects_nan_and_infinity() {
        assert!(finite(f64::NAN).is_err());
        assert!(finite(f64::INFINITY).is_err());
        assert!(finite(f64::NEG_INFINITY).is_err());
        assert_eq!(finite(1.5).unwrap(), 1.5);
    }

    #[test]
    fn parse_of_canonical_round_trips() {
        let v = json!({"b": [1, 2.5, "x"], "a": {"nested": null}, "c": true});
        let s = canonicalize(&v).unwrap();
        let back: Value = serde_json::from_str(&s).unwrap();
        assert_eq!(back, v);
        assert_eq!(canonicalize(&back).unwrap(), s);
    }

    proptest::proptest! {
        #[test]
        fn canonicalize_is_a_fixed_point(v in arbitrary_json(3)) {
            let s = canonicalize(&v).unwrap();
            let back: Value = serde_json::from_str(&s).unwrap();
            proptest::prop_assert_eq!(&back, &v);
            proptest::prop_assert_eq!(canonicalize(&back).unwrap(), s);
        }
    }

    fn arbitrary_json(depth: u32) -> impl proptest::strategy::Strategy<Value = Value> {
        use proptest::prelude::*;
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 _\\-]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(depth, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }
}
