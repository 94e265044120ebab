// SPDX-License-Identifier: MIT OR Apache-2.0
//! The match event stream.
//!
//! Every event shares `seq` (dense, assigned at emission time) and
//! `matchId`; the payload is a `type`-tagged variant. The strict parser
//! is what verifiers use: it rejects non-object lines, missing envelope
//! fields, unknown types, and non-dense `seq`. The lenient parser exists
//! for display paths only (replay rendering of logs written by newer
//! producers) and keeps unparsable lines as raw JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canon::{CanonError, canonicalize_jsonl, to_canonical_value};

/// One entry in the totally ordered event stream of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    /// Dense per-match sequence number, starting at 0.
    pub seq: u64,
    /// Identifier shared by every event of the match.
    #[serde(rename = "matchId")]
    pub match_id: String,
    /// The `type`-tagged payload.
    #[serde(flatten)]
    pub kind: MatchEventKind,
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchEndReason {
    /// The scenario reached a terminal state.
    Completed,
    /// The configured turn limit was exhausted first.
    MaxTurnsReached,
    /// An agent hit the consecutive-timeout limit.
    AgentForfeited,
    /// Preflight failed before turn 1.
    SetupFailed,
}

/// The payload discriminator for [`MatchEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum MatchEventKind {
    /// First event of a successfully started match.
    MatchStarted {
        /// The match seed.
        seed: u32,
        /// Participating agents, in authoritative order.
        agent_ids: Vec<String>,
        /// Scenario display name.
        scenario_name: String,
        /// Configured turn limit.
        max_turns: u32,
        /// Engine git commit, when provenance was requested.
        #[serde(skip_serializing_if = "Option::is_none")]
        engine_commit: Option<String>,
        /// Engine version, when provenance was requested.
        #[serde(skip_serializing_if = "Option::is_none")]
        engine_version: Option<String>,
    },

    /// A new turn began.
    TurnStarted {
        /// 1-based turn number.
        turn: u32,
    },

    /// An observation was delivered to an agent.
    ///
    /// On turn 1 the observation embeds the scenario briefing under a
    /// `gameRules` key; on later turns it must not.
    ObservationEmitted {
        /// Receiving agent.
        agent_id: String,
        /// Turn the observation belongs to.
        turn: u32,
        /// Scenario-shaped observation payload.
        observation: Value,
    },

    /// An agent submitted an action (possibly the fallback).
    ActionSubmitted {
        /// Acting agent.
        agent_id: String,
        /// Turn the action belongs to.
        turn: u32,
        /// The action as handed to the scenario.
        action: Value,
        /// Decoding method, present for fallible (text) agents.
        #[serde(skip_serializing_if = "Option::is_none")]
        method: Option<String>,
        /// How the action reached the adjudicator.
        #[serde(skip_serializing_if = "Option::is_none")]
        adjudication_path: Option<String>,
    },

    /// The scenario ruled on a submitted action.
    ActionAdjudicated {
        /// Acting agent.
        agent_id: String,
        /// Turn the ruling belongs to.
        turn: u32,
        /// Whether the scenario accepted the action.
        valid: bool,
        /// Scenario feedback payload.
        feedback: Value,
        /// Decoding method, for fallible agents.
        #[serde(skip_serializing_if = "Option::is_none")]
        method: Option<String>,
        /// Why the decoder fell back, if it did.
        #[serde(skip_serializing_if = "Option::is_none")]
        fallback_reason: Option<String>,
        /// The action that was ultimately adjudicated.
        #[serde(skip_serializing_if = "Option::is_none")]
        chosen_action: Option<Value>,
        /// A parsed-but-rejected candidate, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        candidate_action: Option<Value>,
        /// `text+tolerant_decode`, `structured`, or `fallback`.
        #[serde(skip_serializing_if = "Option::is_none")]
        adjudication_path: Option<String>,
        /// Decoder warnings.
        #[serde(skip_serializing_if = "Option::is_none")]
        warnings: Option<Vec<String>>,
        /// Decoder errors.
        #[serde(skip_serializing_if = "Option::is_none")]
        errors: Option<Vec<String>>,
    },

    /// Forensic record of a fallible agent's verbatim output.
    AgentRawOutput {
        /// Producing agent.
        agent_id: String,
        /// Turn the output belongs to.
        turn: u32,
        /// `sha256_hex` of the raw UTF-8 text.
        raw_sha256: String,
        /// Byte length of the raw text.
        raw_bytes: u64,
        /// Whether the stored preview was truncated.
        truncated: bool,
        /// The verbatim text. Spectator views must redact this key.
        #[serde(rename = "_private", skip_serializing_if = "Option::is_none")]
        private: Option<Value>,
    },

    /// An agent call failed (timeout or exception).
    AgentError {
        /// Failing agent.
        agent_id: String,
        /// Turn of the failure.
        turn: u32,
        /// Human-readable message.
        message: String,
        /// Machine-readable kind, e.g. `timeout`.
        #[serde(skip_serializing_if = "Option::is_none")]
        error_type: Option<String>,
    },

    /// A submitted action failed schema or decoder checks.
    InvalidAction {
        /// Acting agent.
        agent_id: String,
        /// Turn of the attempt.
        turn: u32,
        /// Why the action was rejected.
        reason: String,
        /// The rejected shape.
        attempted_action: Value,
    },

    /// Public state summary after a turn. Never includes hidden state.
    StateUpdated {
        /// Turn the summary follows.
        turn: u32,
        /// Scenario summary payload.
        summary: Value,
    },

    /// Last event of every match.
    MatchEnded {
        /// Why the match ended.
        reason: MatchEndReason,
        /// Final score per participating agent.
        scores: BTreeMap<String, f64>,
        /// Number of turns played.
        turns: u32,
        /// Optional details; hidden state only under `_private`.
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },

    /// First event when preflight fails before turn 1.
    MatchSetupFailed {
        /// Failure message.
        message: String,
        /// Optional structured details.
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
}

impl MatchEventKind {
    /// Every `type` tag the strict parser accepts.
    pub const TYPE_NAMES: [&'static str; 11] = [
        "MatchStarted",
        "TurnStarted",
        "ObservationEmitted",
        "ActionSubmitted",
        "ActionAdjudicated",
        "AgentRawOutput",
        "AgentError",
        "InvalidAction",
        "StateUpdated",
        "MatchEnded",
        "MatchSetupFailed",
    ];

    /// The `type` tag of this event kind.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::MatchStarted { .. } => "MatchStarted",
            Self::TurnStarted { .. } => "TurnStarted",
            Self::ObservationEmitted { .. } => "ObservationEmitted",
            Self::ActionSubmitted { .. } => "ActionSubmitted",
            Self::ActionAdjudicated { .. } => "ActionAdjudicated",
            Self::AgentRawOutput { .. } => "AgentRawOutput",
            Self::AgentError { .. } => "AgentError",
            Self::InvalidAction { .. } => "InvalidAction",
            Self::StateUpdated { .. } => "StateUpdated",
            Self::MatchEnded { .. } => "MatchEnded",
            Self::MatchSetupFailed { .. } => "MatchSetupFailed",
        }
    }
}

/// Errors from the strict JSONL event parser.
#[derive(Debug, thiserror::Error)]
pub enum LogParseError {
    /// A line was valid JSON but not an object.
    #[error("line {line}: event is not a JSON object")]
    NonObjectLine {
        /// 1-based line number.
        line: usize,
    },
    /// A line was not valid JSON at all.
    #[error("line {line}: malformed JSON: {source}")]
    MalformedJson {
        /// 1-based line number.
        line: usize,
        /// Underlying parse error.
        source: serde_json::Error,
    },
    /// The envelope was missing `type`, `seq`, or `matchId`.
    #[error("line {line}: missing required field `{field}`")]
    MissingField {
        /// 1-based line number.
        line: usize,
        /// Name of the missing field.
        field: &'static str,
    },
    /// The `type` tag is not one of the known event kinds.
    #[error("line {line}: unknown event type `{event_type}`")]
    UnknownEventType {
        /// 1-based line number.
        line: usize,
        /// The offending tag.
        event_type: String,
    },
    /// `seq` did not increase densely from 0.
    #[error("line {line}: non-dense seq (expected {expected}, found {found})")]
    NonDenseSeq {
        /// 1-based line number.
        line: usize,
        /// The expected sequence number.
        expected: u64,
        /// The sequence number found.
        found: u64,
    },
    /// A known-type event body failed to deserialize.
    #[error("line {line}: invalid `{event_type}` body: {source}")]
    InvalidBody {
        /// 1-based line number.
        line: usize,
        /// The event type whose body was invalid.
        event_type: String,
        /// Underlying deserialization error.
        source: serde_json::Error,
    },
}

/// Serialize events as canonical JSONL (one object per line, trailing
/// newline).
///
/// # Errors
///
/// Returns [`CanonError`] if an event cannot be serialized.
pub fn events_to_jsonl(events: &[MatchEvent]) -> Result<String, CanonError> {
    let values = events
        .iter()
        .map(to_canonical_value)
        .collect::<Result<Vec<_>, _>>()?;
    canonicalize_jsonl(&values)
}

/// Strict JSONL parser used by verifiers.
///
/// # Errors
///
/// Returns the first [`LogParseError`] encountered, in line order.
pub fn parse_match_log(text: &str) -> Result<Vec<MatchEvent>, LogParseError> {
    let mut events = Vec::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        if raw_line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(raw_line)
            .map_err(|source| LogParseError::MalformedJson { line, source })?;
        let Value::Object(map) = &value else {
            return Err(LogParseError::NonObjectLine { line });
        };

        for field in ["type", "seq", "matchId"] {
            if !map.contains_key(field) {
                return Err(LogParseError::MissingField { line, field });
            }
        }
        let event_type = map
            .get("type")
            .and_then(Value::as_str)
            .ok_or(LogParseError::MissingField {
                line,
                field: "type",
            })?
            .to_string();
        if !MatchEventKind::TYPE_NAMES.contains(&event_type.as_str()) {
            return Err(LogParseError::UnknownEventType { line, event_type });
        }

        let event: MatchEvent =
            serde_json::from_value(value).map_err(|source| LogParseError::InvalidBody {
                line,
                event_type,
                source,
            })?;
        let expected = events.len() as u64;
        if event.seq != expected {
            return Err(LogParseError::NonDenseSeq {
                line,
                expected,
                found: event.seq,
            });
        }
        events.push(event);
    }
    Ok(events)
}

/// Lenient reader for display paths: keeps every parseable JSON line,
/// drops the rest. Never used by verifiers.
#[must_use]
pub fn parse_match_log_lenient(text: &str) -> Vec<Value> {
    text.lines()
        .filter(|l| !l.is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect()
}
