// SPDX-License-Identifier: MIT OR Apache-2.0
//! Report printing and the replay transcript renderer.
//!
//! The transcript uses the lenient parser and redacts `_private`
//! recursively before anything reaches the page: a spectator artifact
//! must never leak raw agent text or hidden state.

use serde_json::Value;

use arena_core::{parse_match_log_lenient, redact_private};
use arena_verify::VerificationReport;

/// Print a verification report in the CLI's line format.
pub(crate) fn print_report(report: &VerificationReport, verbose: bool) {
    println!("target: {}", report.target);
    for check in &report.checks {
        println!(
            "  {:<18} {}",
            check.name,
            serde_json::to_value(check.status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_uppercase))
                .unwrap_or_default()
        );
        for error in &check.errors {
            println!("    error: {error}");
        }
        if verbose {
            for warning in &check.warnings {
                println!("    warning: {warning}");
            }
        }
    }
    println!(
        "result: {}",
        serde_json::to_value(report.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_uppercase))
            .unwrap_or_default()
    );
}

/// Render a match log as a redacted markdown transcript.
pub(crate) fn render_transcript(log_text: &str) -> String {
    let mut out = String::new();
    let events = parse_match_log_lenient(log_text);

    let match_id = events
        .first()
        .and_then(|e| e.get("matchId"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    out.push_str(&format!("# Match {match_id}\n"));

    for raw in &events {
        let event = redact_private(raw);
        let turn = event.get("turn").and_then(Value::as_u64);
        match event.get("type").and_then(Value::as_str) {
            Some("MatchStarted") => {
                let agents = event
                    .get("agentIds")
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                let scenario = event
                    .get("scenarioName")
                    .and_then(Value::as_str)
                    .unwrap_or("?");
                out.push_str(&format!("\n**{scenario}** with agents {agents}\n"));
            }
            Some("TurnStarted") => {
                out.push_str(&format!("\n## Turn {}\n", turn.unwrap_or(0)));
            }
            Some("ActionSubmitted") => {
                let agent = event.get("agentId").and_then(Value::as_str).unwrap_or("?");
                let action = event.get("action").map(Value::to_string).unwrap_or_default();
                out.push_str(&format!("- **{agent}** plays `{action}`\n"));
            }
            Some("ActionAdjudicated") => {
                let valid = event.get("valid").and_then(Value::as_bool).unwrap_or(false);
                let feedback = event
                    .get("feedback")
                    .map(Value::to_string)
                    .unwrap_or_default();
                let verdict = if valid { "accepted" } else { "rejected" };
                out.push_str(&format!("  - {verdict}: `{feedback}`\n"));
            }
            Some("AgentError") => {
                let agent = event.get("agentId").and_then(Value::as_str).unwrap_or("?");
                let message = event.get("message").and_then(Value::as_str).unwrap_or("");
                out.push_str(&format!("  - *{agent} error: {message}*\n"));
            }
            Some("StateUpdated") => {
                let summary = event
                    .get("summary")
                    .map(Value::to_string)
                    .unwrap_or_default();
                out.push_str(&format!("  - state: `{summary}`\n"));
            }
            Some("MatchEnded") => {
                let reason = event.get("reason").and_then(Value::as_str).unwrap_or("?");
                out.push_str(&format!("\n## Result: {reason}\n"));
                if let Some(scores) = event.get("scores").and_then(Value::as_object) {
                    for (agent, score) in scores {
                        out.push_str(&format!("- {agent}: {score}\n"));
                    }
                }
            }
            Some("MatchSetupFailed") => {
                let message = event.get("message").and_then(Value::as_str).unwrap_or("");
                out.push_str(&format!("\n## Setup failed: {message}\n"));
            }
            _ => {}
        }
    }
    out
}
