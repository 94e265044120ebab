// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recursive `_private` redaction.
//!
//! Any JSON rendered to an external consumer (HTTP responses, spectator
//! exports, replay transcripts) passes through [`redact_private`] first.
//! A single traversal keeps the rule impossible to apply partially.

use serde_json::Value;

/// Key stripped everywhere by [`redact_private`].
pub const PRIVATE_KEY: &str = "_private";

/// Return a copy of `value` with every `_private` key removed, at any
/// depth, including inside arrays.
#[must_use]
pub fn redact_private(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| k.as_str() != PRIVATE_KEY)
                .map(|(k, v)| (k.clone(), redact_private(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_private).collect()),
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_top_level_private() {
        let v = json!({"public": 1, "_private": {"secret": 2}});
        assert_eq!(redact_private(&v), json!({"public": 1}));
    }

    #[test]
    fn strips_nested_and_array_private() {
        let v = json!({
            "details": {"_private": {"secretNumber": 7}, "turns": 3},
            "events": [{"_private": "x", "seq": 0}, {"seq": 1}]
        });
        assert_eq!(
            redact_private(&v),
            json!({
                "details": {"turns": 3},
                "events": [{"seq": 0}, {"seq": 1}]
            })
        );
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(redact_private(&json!(42)), json!(42));
        assert_eq!(redact_private(&json!("s")), json!("s"));
        assert_eq!(redact_private(&json!(null)), json!(null));
    }
}
