// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event-stream invariants.
//!
//! These are the stream-shape rules every well-formed match log obeys,
//! independent of any scenario: bracketing, one match id, turn-1-only
//! briefings, and `_private` confinement. Density of `seq` is enforced
//! by the strict parser before these checks run.

use serde_json::Value;

use arena_core::{MatchEvent, MatchEventKind, to_canonical_value};

/// Check the stream-shape invariants; returns one message per
/// violation, empty when the stream is well-formed.
#[must_use]
pub fn check_event_invariants(events: &[MatchEvent]) -> Vec<String> {
    let mut violations = Vec::new();

    if events.is_empty() {
        violations.push("event stream is empty".to_string());
        return violations;
    }

    // Bracketing: one opener first, one MatchEnded last.
    let openers = events
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                MatchEventKind::MatchStarted { .. } | MatchEventKind::MatchSetupFailed { .. }
            )
        })
        .count();
    if openers != 1 {
        violations.push(format!("expected exactly one opener event, found {openers}"));
    }
    if !matches!(
        events[0].kind,
        MatchEventKind::MatchStarted { .. } | MatchEventKind::MatchSetupFailed { .. }
    ) {
        violations.push("first event is not MatchStarted/MatchSetupFailed".to_string());
    }
    let enders = events
        .iter()
        .filter(|e| matches!(e.kind, MatchEventKind::MatchEnded { .. }))
        .count();
    if enders != 1 {
        violations.push(format!("expected exactly one MatchEnded, found {enders}"));
    }
    if !matches!(
        events[events.len() - 1].kind,
        MatchEventKind::MatchEnded { .. }
    ) {
        violations.push("last event is not MatchEnded".to_string());
    }

    // One match id.
    let match_id = &events[0].match_id;
    if let Some(stray) = events.iter().find(|e| &e.match_id != match_id) {
        violations.push(format!(
            "matchId diverges at seq {}: `{}` vs `{}`",
            stray.seq, stray.match_id, match_id
        ));
    }

    // Observations: turn >= 1, briefing iff turn 1.
    for event in events {
        if let MatchEventKind::ObservationEmitted {
            turn, observation, ..
        } = &event.kind
        {
            if *turn < 1 {
                violations.push(format!("observation at seq {} has turn {turn}", event.seq));
            }
            let has_rules = observation.get("gameRules").is_some();
            if has_rules != (*turn == 1) {
                violations.push(format!(
                    "observation at seq {} violates the turn-1 briefing rule",
                    event.seq
                ));
            }
        }
    }

    // `_private` confinement.
    for event in events {
        if let Some(message) = private_violation(event) {
            violations.push(message);
        }
    }

    // Scores cover exactly the participating agents.
    let started_agents = events.iter().find_map(|e| match &e.kind {
        MatchEventKind::MatchStarted { agent_ids, .. } => Some(agent_ids.clone()),
        _ => None,
    });
    if let Some(agent_ids) = started_agents {
        for event in events {
            if let MatchEventKind::MatchEnded { scores, .. } = &event.kind {
                let mut expected: Vec<&str> = agent_ids.iter().map(String::as_str).collect();
                expected.sort_unstable();
                let mut actual: Vec<&str> = scores.keys().map(String::as_str).collect();
                actual.sort_unstable();
                if expected != actual {
                    violations.push(format!(
                        "scores cover {actual:?} but the match started with {expected:?}"
                    ));
                }
            }
        }
    }

    violations
}

/// Locate a `_private` key outside its two sanctioned homes.
fn private_violation(event: &MatchEvent) -> Option<String> {
    let Ok(mut value) = to_canonical_value(event) else {
        return Some(format!("event at seq {} is not serializable", event.seq));
    };

    match &event.kind {
        MatchEventKind::AgentRawOutput { .. } => {
            if let Value::Object(map) = &mut value {
                map.remove("_private");
            }
        }
        MatchEventKind::MatchEnded { .. } => {
            if let Some(details) = value.get_mut("details").and_then(Value::as_object_mut) {
                details.remove("_private");
            }
        }
        _ => {}
    }

    has_private(&value).then(|| {
        format!(
            "`_private` appears outside its sanctioned position at seq {}",
            event.seq
        )
    })
}

fn has_private(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.contains_key("_private") || map.values().any(has_private)
        }
        Value::Array(items) => items.iter().any(has_private),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn event(seq: u64, kind: MatchEventKind) -> MatchEvent {
        MatchEvent {
            seq,
            match_id: "m1".into(),
            kind,
        }
    }

    fn minimal_stream() -> Vec<MatchEvent> {
        vec![
            event(
                0,
                MatchEventKind::MatchStarted {
                    seed: 1,
                    agent_ids: vec!["a".into()],
                    scenario_name: "Count".into(),
                    max_turns: 1,
                    engine_commit: None,
                    engine_version: None,
                },
            ),
            event(
                1,
                MatchEventKind::MatchEnded {
                    reason: arena_core::MatchEndReason::Completed,
                    scores: BTreeMap::from([("a".to_string(), 1.0)]),
                    turns: 0,
                    details: Some(json!({"_private": {"secret": 5}})),
                },
            ),
        ]
    }

    #[test]
    fn minimal_stream_is_clean() {
        assert!(check_event_invariants(&minimal_stream()).is_empty());
    }

    #[test]
    fn missing_ender_is_flagged() {
        let mut events = minimal_stream();
        events.pop();
        let violations = check_event_invariants(&events);
        assert!(violations.iter().any(|v| v.contains("MatchEnded")));
    }

    #[test]
    fn diverging_match_id_is_flagged() {
        let mut events = minimal_stream();
        events[1].match_id = "other".into();
        let violations = check_event_invariants(&events);
        assert!(violations.iter().any(|v| v.contains("matchId diverges")));
    }

    #[test]
    fn briefing_on_later_turn_is_flagged() {
        let mut events = minimal_stream();
        events.insert(
            1,
            event(
                1,
                MatchEventKind::ObservationEmitted {
                    agent_id: "a".into(),
                    turn: 2,
                    observation: json!({"gameRules": {}}),
                },
            ),
        );
        events[2].seq = 2;
        let violations = check_event_invariants(&events);
        assert!(violations.iter().any(|v| v.contains("turn-1 briefing")));
    }

    #[test]
    fn private_outside_sanctioned_homes_is_flagged() {
        let mut events = minimal_stream();
        events.insert(
            1,
            event(
                1,
                MatchEventKind::StateUpdated {
                    turn: 1,
                    summary: json!({"_private": {"leak": true}}),
                },
            ),
        );
        events[2].seq = 2;
        let violations = check_event_invariants(&events);
        assert!(violations.iter().any(|v| v.contains("_private")));
    }

    #[test]
    fn score_coverage_mismatch_is_flagged() {
        let mut events = minimal_stream();
        if let MatchEventKind::MatchEnded { scores, .. } = &mut events[1].kind {
            scores.insert("ghost".to_string(), 0.0);
        }
        let violations = check_event_invariants(&events);
        assert!(violations.iter().any(|v| v.contains("scores cover")));
    }
}
