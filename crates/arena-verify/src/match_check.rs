// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-match verification.
//!
//! Recomputes what `match_summary.json` claims: the log hash over the
//! raw `match.jsonl` bytes and the manifest hash over the manifest
//! core. Also re-parses the log strictly and checks the stream
//! invariants, so a bundle cannot pass with a log its own parser would
//! reject.

use std::path::Path;

use serde_json::Value;

use arena_core::{
    MatchEventKind, MatchSummary, hash_file, hash_manifest_core, parse_match_log,
};

use crate::invariants::check_event_invariants;
use crate::report::{CheckBuilder, VerificationReport};

/// The three files every match directory must hold.
pub const REQUIRED_MATCH_FILES: [&str; 3] =
    ["match.jsonl", "match_manifest.json", "match_summary.json"];

/// Verify one match directory.
#[must_use]
pub fn verify_match(dir: &Path) -> VerificationReport {
    let mut structure = CheckBuilder::new("structure");
    for name in REQUIRED_MATCH_FILES {
        if !dir.join(name).is_file() {
            structure.structural(format!("missing required file `{name}`"));
        }
    }
    if structure.has_errors() {
        return VerificationReport::new(dir.display().to_string(), vec![structure.finish()]);
    }
    let structure = structure.finish();

    let mut log = CheckBuilder::new("log");
    let mut hashes = CheckBuilder::new("contentHashes");

    let summary: Option<MatchSummary> = match read_json(dir, "match_summary.json") {
        Ok(value) => match serde_json::from_value(value) {
            Ok(summary) => Some(summary),
            Err(e) => {
                log.structural(format!("match_summary.json is not a summary: {e}"));
                None
            }
        },
        Err(e) => {
            log.structural(e);
            None
        }
    };
    let manifest: Option<Value> = match read_json(dir, "match_manifest.json") {
        Ok(value) => Some(value),
        Err(e) => {
            log.structural(e);
            None
        }
    };

    let log_text = std::fs::read_to_string(dir.join("match.jsonl")).ok();
    match &log_text {
        Some(text) => match parse_match_log(text) {
            Ok(events) => {
                for violation in check_event_invariants(&events) {
                    log.error(violation);
                }
                if let Some(summary) = &summary {
                    if let Some(first) = events.first()
                        && first.match_id != summary.match_id
                    {
                        log.error(format!(
                            "log matchId `{}` differs from summary matchId `{}`",
                            first.match_id, summary.match_id
                        ));
                    }
                    let timeout_events = events
                        .iter()
                        .filter(|e| {
                            matches!(
                                &e.kind,
                                MatchEventKind::AgentError {
                                    error_type: Some(t),
                                    ..
                                } if t == "timeout"
                            )
                        })
                        .count() as u32;
                    let recorded: u32 = summary.timeouts_per_agent.values().sum();
                    if timeout_events != recorded {
                        log.error(format!(
                            "summary records {recorded} timeouts but the log holds {timeout_events}"
                        ));
                    }
                }
            }
            Err(e) => log.error(format!("match.jsonl failed strict parsing: {e}")),
        },
        None => log.structural("match.jsonl is unreadable"),
    }

    if let Some(summary) = &summary {
        match hash_file(&dir.join("match.jsonl")) {
            Ok(recomputed) => {
                if recomputed != summary.hashes.log_hash {
                    hashes.error(format!(
                        "logHash mismatch: stored {}, recomputed {recomputed}",
                        summary.hashes.log_hash
                    ));
                }
            }
            Err(e) => hashes.structural(format!("failed to hash match.jsonl: {e}")),
        }
        if let Some(manifest) = &manifest {
            match hash_manifest_core(manifest) {
                Ok(recomputed) => {
                    if recomputed != summary.hashes.manifest_hash {
                        hashes.error(format!(
                            "manifestHash mismatch: stored {}, recomputed {recomputed}",
                            summary.hashes.manifest_hash
                        ));
                    }
                }
                Err(e) => hashes.structural(format!("failed to hash manifest core: {e}")),
            }
            if let Some(manifest_id) = manifest.get("matchId").and_then(Value::as_str)
                && manifest_id != summary.match_id
            {
                log.error(format!(
                    "manifest matchId `{manifest_id}` differs from summary matchId `{}`",
                    summary.match_id
                ));
            }
        }
    }

    VerificationReport::new(
        dir.display().to_string(),
        vec![structure, log.finish(), hashes.finish()],
    )
}

/// Read and parse a JSON file, with a readable error string.
pub(crate) fn read_json(dir: &Path, name: &str) -> Result<Value, String> {
    let path = dir.join(name);
    let text =
        std::fs::read_to_string(&path).map_err(|e| format!("failed to read `{name}`: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("`{name}` is not valid JSON: {e}"))
}
