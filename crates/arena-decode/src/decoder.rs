// SPDX-License-Identifier: MIT OR Apache-2.0
//! The tolerant decode pipeline.
//!
//! Attempts, in order: the whole input as JSON, the longest valid
//! fenced block, balanced `{...}` runs longest-first, and finally the
//! single-key `action`/`response`/`result` unwrap rule applied to any
//! parsed candidate. The first value that validates under the action
//! schema wins; otherwise the caller's fallback action is returned with
//! a reason.

use serde::Serialize;
use serde_json::Value;

use arena_core::sha256_hex;

use crate::schema::CompiledSchema;

/// Wrapper keys recognised by the unwrap rule.
const WRAPPER_KEYS: [&str; 3] = ["action", "response", "result"];

/// Bounds on how hard the decoder scans pathological input.
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    /// Maximum brace nesting followed during extraction.
    pub max_brace_depth: usize,
    /// Maximum bytes scanned for brace runs.
    pub max_scan_bytes: usize,
    /// Maximum bytes of raw text kept in the forensic preview.
    pub max_raw_bytes: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_brace_depth: 16,
            max_scan_bytes: 64 * 1024,
            max_raw_bytes: 8 * 1024,
        }
    }
}

/// How a value was recovered from the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecodeMethod {
    /// The entire trimmed input was valid JSON.
    DirectJson,
    /// A fenced code block held valid JSON.
    FencedJson,
    /// A balanced brace run held valid JSON.
    BraceExtract,
    /// A single-key wrapper object was unwrapped.
    Unwrapped,
}

impl DecodeMethod {
    /// Wire name of the method.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectJson => "direct-json",
            Self::FencedJson => "fenced-json",
            Self::BraceExtract => "brace-extract",
            Self::Unwrapped => "unwrapped",
        }
    }
}

/// Why the decoder gave up and returned the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackReason {
    /// Nothing in the input parsed as JSON.
    NoJsonFound,
    /// JSON parsed, but no candidate satisfied the schema.
    SchemaValidationFailed,
    /// JSON parsed, but it was not an object the schema could apply to.
    NormalizationFailed,
}

impl FallbackReason {
    /// Wire name of the reason.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoJsonFound => "no-json-found",
            Self::SchemaValidationFailed => "schema-validation-failed",
            Self::NormalizationFailed => "normalization-failed",
        }
    }
}

/// The decoder's verdict plus its full forensic record.
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    /// Whether a schema-valid action was recovered.
    pub ok: bool,
    /// The recovered action, or the fallback when `!ok`.
    pub action: Value,
    /// Method that produced `action`, when `ok`.
    pub method: Option<DecodeMethod>,
    /// Reason for the fallback, when `!ok`.
    pub fallback_reason: Option<FallbackReason>,
    /// `sha256_hex` of the raw UTF-8 input. Always present.
    pub raw_sha256: String,
    /// Byte length of the raw input.
    pub raw_bytes: u64,
    /// Whether [`DecodeOutcome::raw_preview`] was truncated.
    pub truncated: bool,
    /// The raw input, capped at the configured preview size.
    pub raw_preview: String,
    /// A candidate that parsed but failed validation, if any.
    pub candidate_action: Option<Value>,
    /// Non-fatal notes (unwrapping, skipped spans).
    pub warnings: Vec<String>,
    /// Schema validation messages for the rejected candidate.
    pub errors: Vec<String>,
}

/// Decode free-form agent text into a schema-valid action.
///
/// Never fails: on exhaustion the returned outcome carries `fallback`
/// as the action and a [`FallbackReason`].
#[must_use]
pub fn decode_action(
    raw: &str,
    schema: &CompiledSchema,
    fallback: &Value,
    limits: &DecodeLimits,
) -> DecodeOutcome {
    let mut outcome = DecodeOutcome {
        ok: false,
        action: fallback.clone(),
        method: None,
        fallback_reason: None,
        raw_sha256: sha256_hex(raw.as_bytes()),
        raw_bytes: raw.len() as u64,
        truncated: raw.len() > limits.max_raw_bytes,
        raw_preview: truncate_utf8(raw, limits.max_raw_bytes),
        candidate_action: None,
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    let mut candidates: Vec<(DecodeMethod, Value)> = Vec::new();

    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed)
        && !trimmed.is_empty()
    {
        candidates.push((DecodeMethod::DirectJson, value));
    }
    if let Some(value) = longest_fenced_json(raw) {
        candidates.push((DecodeMethod::FencedJson, value));
    }
    for value in brace_extract(raw, limits, &mut outcome.warnings) {
        candidates.push((DecodeMethod::BraceExtract, value));
    }

    let mut saw_object = false;
    for (method, value) in &candidates {
        if schema.is_valid(value) {
            outcome.ok = true;
            outcome.action = value.clone();
            outcome.method = Some(*method);
            return outcome;
        }
        if let Some(inner) = unwrap_single_key(value)
            && schema.is_valid(inner)
        {
            outcome.ok = true;
            outcome.action = inner.clone();
            outcome.method = Some(DecodeMethod::Unwrapped);
            outcome
                .warnings
                .push("unwrapped single-key envelope".to_string());
            return outcome;
        }
        if value.is_object() {
            saw_object = true;
        }
        if outcome.candidate_action.is_none() {
            outcome.candidate_action = Some(value.clone());
            outcome.errors = schema.errors(value);
        }
    }

    outcome.fallback_reason = Some(if candidates.is_empty() {
        FallbackReason::NoJsonFound
    } else if saw_object {
        FallbackReason::SchemaValidationFailed
    } else {
        FallbackReason::NormalizationFailed
    });
    outcome
}

/// Unwrap `{"action": X}` / `{"response": X}` / `{"result": X}`.
fn unwrap_single_key(value: &Value) -> Option<&Value> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    let (key, inner) = map.iter().next()?;
    WRAPPER_KEYS.contains(&key.as_str()).then_some(inner)
}

/// The longest ```-fenced block (tag `json` or none) whose contents
/// parse as JSON.
fn longest_fenced_json(raw: &str) -> Option<Value> {
    let mut best: Option<(usize, Value)> = None;
    let mut rest = raw;
    while let Some(open) = rest.find("```") {
        let after_open = &rest[open + 3..];
        // Optional language tag up to the first newline.
        let body_start = match after_open.find('\n') {
            Some(nl) => {
                let tag = after_open[..nl].trim();
                if !tag.is_empty() && !tag.eq_ignore_ascii_case("json") {
                    // A fenced block for some other language; skip it.
                    match after_open.find("```") {
                        Some(close) => {
                            rest = &after_open[close + 3..];
                            continue;
                        }
                        None => return best.map(|(_, v)| v),
                    }
                }
                nl + 1
            }
            None => return best.map(|(_, v)| v),
        };
        let body = &after_open[body_start..];
        let Some(close) = body.find("```") else {
            return best.map(|(_, v)| v);
        };
        let content = body[..close].trim();
        if let Ok(value) = serde_json::from_str::<Value>(content)
            && best.as_ref().is_none_or(|(len, _)| content.len() > *len)
        {
            best = Some((content.len(), value));
        }
        rest = &body[close + 3..];
    }
    best.map(|(_, v)| v)
}

/// Balanced top-level `{...}` spans, parsed longest first.
fn brace_extract(raw: &str, limits: &DecodeLimits, warnings: &mut Vec<String>) -> Vec<Value> {
    let window_end = floor_char_boundary(raw, limits.max_scan_bytes);
    let window = &raw[..window_end];
    if window_end < raw.len() {
        warnings.push(format!(
            "brace scan stopped after {window_end} bytes (input is {} bytes)",
            raw.len()
        ));
    }

    let bytes = window.as_bytes();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut overflowed = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = i;
                    overflowed = false;
                }
                depth += 1;
                if depth > limits.max_brace_depth {
                    overflowed = true;
                }
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if overflowed {
                        warnings.push(format!(
                            "skipped brace run at byte {start}: nesting exceeded {}",
                            limits.max_brace_depth
                        ));
                    } else {
                        spans.push((start, i + 1));
                    }
                }
            }
            _ => {}
        }
    }

    spans.sort_by_key(|(s, e)| std::cmp::Reverse(e - s));
    spans
        .into_iter()
        .filter_map(|(s, e)| serde_json::from_str::<Value>(&window[s..e]).ok())
        .collect()
}

/// Largest char-boundary index `<= max`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Truncate a string at a char boundary no later than `max` bytes.
fn truncate_utf8(s: &str, max: usize) -> String {
    s[..floor_char_boundary(s, max)].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn move_schema() -> CompiledSchema {
        CompiledSchema::compile(&json!({
            "type": "object",
            "required": ["type"],
            "properties": {
                "type": {"enum": ["move", "pickup", "wait"]},
                "toRoomId": {"type": "string"},
                "itemId": {"type": "string"}
            },
            "additionalProperties": false
        }))
        .unwrap()
    }

    fn fallback() -> Value {
        json!({"type": "wait"})
    }

    #[test]
    fn direct_json_wins() {
        let out = decode_action(
            r#"{"type":"move","toRoomId":"room-2"}"#,
            &move_schema(),
            &fallback(),
            &DecodeLimits::default(),
        );
        assert!(out.ok);
        assert_eq!(out.method, Some(DecodeMethod::DirectJson));
        assert_eq!(out.action["toRoomId"], "room-2");
    }

    #[test]
    fn fenced_block_is_recovered() {
        let raw = "Here is my move:\n```json\n{\"type\":\"pickup\",\"itemId\":\"keycard-1\"}\n```\nthanks";
        let out = decode_action(raw, &move_schema(), &fallback(), &DecodeLimits::default());
        assert!(out.ok);
        assert_eq!(out.method, Some(DecodeMethod::FencedJson));
        assert_eq!(out.action["itemId"], "keycard-1");
    }

    #[test]
    fn untagged_fence_works_and_longest_wins() {
        let raw = "```\n{\"type\":\"wait\"}\n```\n```json\n{\"type\":\"move\",\"toRoomId\":\"room-9\"}\n```";
        let out = decode_action(raw, &move_schema(), &fallback(), &DecodeLimits::default());
        assert!(out.ok);
        // The longer block parses and validates; it is the one chosen.
        assert_eq!(out.action["type"], "move");
    }

    #[test]
    fn brace_extract_digs_json_out_of_prose() {
        let raw = r#"I think I'll go with {"type":"move","toRoomId":"room-3"} this turn."#;
        let out = decode_action(raw, &move_schema(), &fallback(), &DecodeLimits::default());
        assert!(out.ok);
        assert_eq!(out.method, Some(DecodeMethod::BraceExtract));
    }

    #[test]
    fn unwrapped_envelope_is_recognised() {
        let raw = r#"{"action":{"type":"move","toRoomId":"room-4"}}"#;
        let out = decode_action(raw, &move_schema(), &fallback(), &DecodeLimits::default());
        assert!(out.ok);
        assert_eq!(out.method, Some(DecodeMethod::Unwrapped));
        assert_eq!(out.action["toRoomId"], "room-4");
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn empty_input_is_no_json_found() {
        let out = decode_action("", &move_schema(), &fallback(), &DecodeLimits::default());
        assert!(!out.ok);
        assert_eq!(out.fallback_reason, Some(FallbackReason::NoJsonFound));
        assert_eq!(out.action, fallback());
        assert_eq!(
            out.raw_sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn garbage_is_no_json_found() {
        let out = decode_action(
            "garbage response",
            &move_schema(),
            &fallback(),
            &DecodeLimits::default(),
        );
        assert!(!out.ok);
        assert_eq!(out.fallback_reason, Some(FallbackReason::NoJsonFound));
    }

    #[test]
    fn schema_failure_reports_candidate() {
        let out = decode_action(
            r#"{"type":"teleport"}"#,
            &move_schema(),
            &fallback(),
            &DecodeLimits::default(),
        );
        assert!(!out.ok);
        assert_eq!(
            out.fallback_reason,
            Some(FallbackReason::SchemaValidationFailed)
        );
        assert_eq!(out.candidate_action, Some(json!({"type": "teleport"})));
        assert!(!out.errors.is_empty());
    }

    #[test]
    fn non_object_json_is_normalization_failure() {
        let out = decode_action(
            "[1, 2, 3]",
            &move_schema(),
            &fallback(),
            &DecodeLimits::default(),
        );
        assert!(!out.ok);
        assert_eq!(
            out.fallback_reason,
            Some(FallbackReason::NormalizationFailed)
        );
    }

    #[test]
    fn brace_depth_limit_rejects_deep_nesting() {
        let deep = format!("prefix {}{}", "{".repeat(8), "}".repeat(8));
        let limits = DecodeLimits {
            max_brace_depth: 2,
            ..DecodeLimits::default()
        };
        let out = decode_action(&deep, &move_schema(), &fallback(), &limits);
        assert!(!out.ok);
        assert_eq!(out.fallback_reason, Some(FallbackReason::NoJsonFound));
        assert!(out.warnings.iter().any(|w| w.contains("nesting")));
    }

    #[test]
    fn scan_window_caps_work() {
        let raw = format!("{}{}", "g".repeat(100), r#"{"type":"wait"}"#);
        let limits = DecodeLimits {
            max_scan_bytes: 50,
            ..DecodeLimits::default()
        };
        let out = decode_action(&raw, &move_schema(), &fallback(), &limits);
        assert!(!out.ok);
        assert!(out.warnings.iter().any(|w| w.contains("brace scan")));
    }

    #[test]
    fn forensics_record_size_and_truncation() {
        let raw = "x".repeat(100);
        let limits = DecodeLimits {
            max_raw_bytes: 10,
            ..DecodeLimits::default()
        };
        let out = decode_action(&raw, &move_schema(), &fallback(), &limits);
        assert_eq!(out.raw_bytes, 100);
        assert!(out.truncated);
        assert_eq!(out.raw_preview.len(), 10);
        assert_eq!(out.raw_sha256, sha256_hex(raw.as_bytes()));
    }

    #[test]
    fn strings_containing_braces_do_not_confuse_the_scanner() {
        let raw = r#"note: {"type":"move","toRoomId":"a}b"} end"#;
        let out = decode_action(raw, &move_schema(), &fallback(), &DecodeLimits::default());
        assert!(out.ok);
        assert_eq!(out.action["toRoomId"], "a}b");
    }
}
