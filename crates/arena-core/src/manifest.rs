// SPDX-License-Identifier: MIT OR Apache-2.0
//! Manifest, summary, broadcast, and status shapes.
//!
//! These are the truth and telemetry records written into match and
//! tournament directories. Field names are the wire names; everything
//! here serializes camelCase. Hashing always goes through
//! [`crate::hash::manifest_core`], never ad hoc.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::MatchEndReason;

/// Canonical descriptor of a match's inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchManifest {
    /// Opaque match identifier generated from the master PRNG.
    pub match_id: String,
    /// Mode profile the match ran under (e.g. `standard`).
    pub mode_profile_id: String,
    /// Scenario identity and content hash.
    pub scenario: ScenarioRef,
    /// Participating agents, in authoritative order.
    pub agents: Vec<AgentSpec>,
    /// Runner configuration inputs.
    pub config: MatchConfigManifest,
    /// Identity of the harness that produced the match.
    pub runner: RunnerInfo,
    /// RFC 3339 creation timestamp. Excluded from the manifest hash.
    pub created_at: String,
}

/// Scenario identity embedded in a [`MatchManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRef {
    /// Registry key, e.g. `numberGuess`.
    pub id: String,
    /// Scenario rulebook version.
    pub version: String,
    /// Version of the scenario interface contract.
    pub contract_version: String,
    /// Content hash of the scenario identity (`sha256:` prefixed).
    pub content_hash: String,
}

/// One agent entry in a [`MatchManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    /// Agent id, unique within the match.
    pub id: String,
    /// `scripted` or `llm`.
    pub kind: String,
    /// Role of the agent in the match (normally `competitor`).
    pub purpose: String,
    /// Model provider for gateway-backed agents.
    pub provider: Option<String>,
    /// Model name for gateway-backed agents.
    pub model: Option<String>,
    /// Agent implementation version.
    pub version: String,
    /// Content hash of the agent identity (`sha256:` prefixed).
    pub content_hash: String,
    /// Free-form extras (division config, gateway URL, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Configuration section of a [`MatchManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfigManifest {
    /// Turn limit.
    pub max_turns: u32,
    /// Per-agent-call timeout in milliseconds (0 disables).
    pub max_turn_time_ms: u64,
    /// The match seed.
    pub seed: u32,
    /// How the seed was derived, for tournament matches.
    pub seed_derivation_inputs: SeedDerivationInputs,
}

/// Provenance of a match seed.
///
/// Standalone matches carry explicit nulls so the shape is uniform
/// across producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedDerivationInputs {
    /// Tournament seed the match seed was derived from, if any.
    pub tournament_seed: Option<u32>,
    /// Tournament-local match key, if any.
    pub match_key: Option<String>,
}

/// Identity of the harness embedded in manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerInfo {
    /// Harness name.
    pub name: String,
    /// Harness version.
    pub version: String,
    /// Git commit, when provenance was requested.
    pub git_commit: Option<String>,
}

/// Content hashes attached to a [`MatchSummary`] after the log exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchHashes {
    /// `sha256:`-prefixed hash of `match.jsonl` bytes.
    pub log_hash: String,
    /// `sha256:`-prefixed hash of the manifest core.
    pub manifest_hash: String,
}

/// Output summary of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    /// Opaque match identifier.
    pub match_id: String,
    /// Tournament-local key, absent for standalone matches.
    pub match_key: Option<String>,
    /// The match seed.
    pub seed: u32,
    /// Participating agents, in authoritative order.
    pub agent_ids: Vec<String>,
    /// Final score per agent.
    pub scores: BTreeMap<String, f64>,
    /// Timeout count per agent.
    pub timeouts_per_agent: BTreeMap<String, u32>,
    /// Agent that forfeited, if the match ended that way.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forfeited_by: Option<String>,
    /// Agent with the strictly highest score; `null` on a draw.
    pub winner: Option<String>,
    /// Turns played.
    pub turns: u32,
    /// Why the match ended.
    pub reason: MatchEndReason,
    /// Hashes computed after `match.jsonl` was written.
    pub hashes: MatchHashes,
    /// Failure annotations (decoder fallbacks, timeouts), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_modes: Option<Vec<String>>,
}

/// One scheduled match inside a [`TournamentManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentMatchEntry {
    /// Tournament-local match key.
    pub match_key: String,
    /// Seed derived from the tournament seed and match key.
    pub seed: u32,
    /// Scenario display name.
    pub scenario_name: String,
    /// Seat order for the match (post swap).
    pub agent_ids: Vec<String>,
    /// Turn limit.
    pub max_turns: u32,
}

/// Canonical descriptor of a tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentManifest {
    /// Root seed every match seed derives from.
    pub tournament_seed: u32,
    /// Scenario display name.
    pub scenario_name: String,
    /// Competitor ids, in registration order.
    pub agents: Vec<String>,
    /// Every scheduled match.
    pub matches: Vec<TournamentMatchEntry>,
    /// Mode profile, if one was configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode_profile: Option<String>,
    /// Harness version that produced the bundle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harness_version: Option<String>,
    /// Fingerprint over every match's log hash. `null` until the
    /// post-pass fills it in; excluded from the manifest hash.
    pub truth_bundle_hash: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Classification of a bundle file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileClass {
    /// Authoritative for reproduction.
    Truth,
    /// Derived observational data.
    Telemetry,
    /// Derived presentation data.
    Show,
}

/// One file entry in a [`BroadcastManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastFileEntry {
    /// Bundle-relative path.
    pub path: String,
    /// Truth / telemetry / show.
    pub class: FileClass,
    /// Content hash, filled for truth files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Media type hint, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Enumeration of every bundle-visible file with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastManifest {
    /// Bundle identifier (match id or tournament id).
    pub bundle_id: String,
    /// `match` or `tournament`.
    pub bundle_type: String,
    /// Mode profile the bundle was produced under.
    pub mode_profile_id: String,
    /// Producer identity string.
    pub created_by: String,
    /// Every bundle-visible file.
    pub files: Vec<BroadcastFileEntry>,
    /// Fingerprint over the bundle's log hashes.
    pub truth_bundle_hash: String,
}

/// Lifecycle states recorded in the live-status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchLifecycle {
    /// Created, before turn 1.
    Waiting,
    /// Turn loop in progress.
    Running,
    /// Finished normally.
    Completed,
    /// Setup or runtime failure.
    Failed,
    /// Writer process died (set by an external supervisor).
    Crashed,
}

/// The live-status file (`match_status.json`), written atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatus {
    /// Match being reported on.
    pub match_id: String,
    /// Current lifecycle state.
    pub status: MatchLifecycle,
    /// Latest turn reached.
    pub turn: u32,
    /// RFC 3339 timestamp of this update.
    pub updated_at: String,
    /// Failure message, for `failed`/`crashed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn manifest_serializes_camel_case() {
        let manifest = MatchManifest {
            match_id: "m1".into(),
            mode_profile_id: "standard".into(),
            scenario: ScenarioRef {
                id: "numberGuess".into(),
                version: "1.0.0".into(),
                contract_version: "1".into(),
                content_hash: "sha256:00".into(),
            },
            agents: vec![],
            config: MatchConfigManifest {
                max_turns: 20,
                max_turn_time_ms: 0,
                seed: 42,
                seed_derivation_inputs: SeedDerivationInputs {
                    tournament_seed: None,
                    match_key: None,
                },
            },
            runner: RunnerInfo {
                name: "agent-arena".into(),
                version: "0.1.0".into(),
                git_commit: None,
            },
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        let v = serde_json::to_value(&manifest).unwrap();
        assert_eq!(v["matchId"], "m1");
        assert_eq!(v["config"]["maxTurnTimeMs"], 0);
        assert_eq!(v["config"]["seedDerivationInputs"]["tournamentSeed"], json!(null));
        assert_eq!(v["runner"]["gitCommit"], json!(null));
    }

    #[test]
    fn file_class_serializes_lowercase() {
        assert_eq!(serde_json::to_value(FileClass::Truth).unwrap(), json!("truth"));
        assert_eq!(serde_json::to_value(FileClass::Show).unwrap(), json!("show"));
    }

    #[test]
    fn status_round_trips() {
        let status = MatchStatus {
            match_id: "m1".into(),
            status: MatchLifecycle::Running,
            turn: 3,
            updated_at: "2026-01-01T00:00:00Z".into(),
            error: None,
        };
        let v = serde_json::to_value(&status).unwrap();
        assert_eq!(v["status"], "running");
        let back: MatchStatus = serde_json::from_value(v).unwrap();
        assert_eq!(back, status);
    }
}
