// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-match directory writing.
//!
//! Write order: `match.jsonl` first, then the manifest, then the
//! summary that embeds both hashes. A self-verification pass over the
//! fresh directory is written last so a bundle carries the evidence
//! that it verified at production time.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::info;

use arena_core::{
    AgentSpec, HASH_PREFIX, MatchConfigManifest, MatchHashes, MatchManifest, MatchSummary,
    RUNNER_NAME, RUNNER_VERSION, RunnerInfo, ScenarioRef, SeedDerivationInputs, canonicalize,
    events_to_jsonl, hash_file, hash_manifest_core, sha256_hex, to_canonical_value,
};
use arena_runtime::{MatchResult, Scenario};

use crate::write::{ArtifactError, write_canonical_file};

/// Inputs the writer needs beyond the [`MatchResult`] itself.
#[derive(Debug, Clone)]
pub struct MatchContext {
    /// Scenario identity for the manifest.
    pub scenario: ScenarioRef,
    /// Agent entries for the manifest, in seat order.
    pub agents: Vec<AgentSpec>,
    /// Mode profile the match ran under.
    pub mode_profile_id: String,
    /// Tournament-local match key, when part of a tournament.
    pub match_key: Option<String>,
    /// Tournament seed, when part of a tournament.
    pub tournament_seed: Option<u32>,
    /// Turn limit the match ran under.
    pub max_turns: u32,
    /// Git commit for the runner section, when provenance is on.
    pub git_commit: Option<String>,
}

/// Build a [`ScenarioRef`] with its content hash.
///
/// The hash covers the seed-independent identity (key, version,
/// contract version), so two bundles produced by the same rulebook
/// carry the same scenario hash regardless of seeds.
///
/// # Errors
///
/// Returns [`ArtifactError`] if the identity cannot be canonicalized.
pub fn scenario_ref(
    scenario: &dyn Scenario,
    contract_version: &str,
) -> Result<ScenarioRef, ArtifactError> {
    let identity = json!({
        "id": scenario.key(),
        "version": scenario.version(),
        "contractVersion": contract_version,
    });
    let content_hash = format!(
        "{HASH_PREFIX}{}",
        sha256_hex(canonicalize(&identity)?.as_bytes())
    );
    Ok(ScenarioRef {
        id: scenario.key().to_string(),
        version: scenario.version().to_string(),
        contract_version: contract_version.to_string(),
        content_hash,
    })
}

/// Build an [`AgentSpec`] with its content hash.
///
/// # Errors
///
/// Returns [`ArtifactError`] if the identity cannot be canonicalized.
pub fn agent_spec(
    id: &str,
    kind: &str,
    provider: Option<String>,
    model: Option<String>,
    version: &str,
    metadata: Option<Value>,
) -> Result<AgentSpec, ArtifactError> {
    let identity = json!({
        "id": id,
        "kind": kind,
        "provider": provider,
        "model": model,
        "version": version,
    });
    let content_hash = format!(
        "{HASH_PREFIX}{}",
        sha256_hex(canonicalize(&identity)?.as_bytes())
    );
    Ok(AgentSpec {
        id: id.to_string(),
        kind: kind.to_string(),
        purpose: "competitor".to_string(),
        provider,
        model,
        version: version.to_string(),
        content_hash,
        metadata,
    })
}

/// Write `match.jsonl`, `match_manifest.json`, and
/// `match_summary.json` into `dir`, returning the summary.
///
/// # Errors
///
/// Returns [`ArtifactError`] on serialization or I/O failure.
pub fn write_match_artifacts(
    dir: &Path,
    result: &MatchResult,
    ctx: &MatchContext,
) -> Result<MatchSummary, ArtifactError> {
    std::fs::create_dir_all(dir)?;

    // 1. The event log: the single source of truth.
    let log_text = events_to_jsonl(&result.events)?;
    std::fs::write(dir.join("match.jsonl"), &log_text)?;

    // 2. The manifest of inputs.
    let manifest = MatchManifest {
        match_id: result.match_id.clone(),
        mode_profile_id: ctx.mode_profile_id.clone(),
        scenario: ctx.scenario.clone(),
        agents: ctx.agents.clone(),
        config: MatchConfigManifest {
            max_turns: ctx.max_turns,
            max_turn_time_ms: result.max_turn_time_ms,
            seed: result.seed,
            seed_derivation_inputs: SeedDerivationInputs {
                tournament_seed: ctx.tournament_seed,
                match_key: ctx.match_key.clone(),
            },
        },
        runner: RunnerInfo {
            name: RUNNER_NAME.to_string(),
            version: RUNNER_VERSION.to_string(),
            git_commit: ctx.git_commit.clone(),
        },
        created_at: now_rfc3339(),
    };
    let manifest_value = to_canonical_value(&manifest)?;
    write_canonical_file(&dir.join("match_manifest.json"), &manifest_value)?;

    // 3. Hashes exist only now; the summary embeds them.
    let log_hash = hash_file(&dir.join("match.jsonl"))?;
    let manifest_hash = hash_manifest_core(&manifest_value)?;

    let summary = MatchSummary {
        match_id: result.match_id.clone(),
        match_key: ctx.match_key.clone(),
        seed: result.seed,
        agent_ids: ctx.agents.iter().map(|a| a.id.clone()).collect(),
        scores: result.scores.clone(),
        timeouts_per_agent: result.timeouts_per_agent.clone(),
        forfeited_by: result.forfeited_by.clone(),
        winner: winner_of(&result.scores),
        turns: result.turns,
        reason: result.reason,
        hashes: MatchHashes {
            log_hash,
            manifest_hash,
        },
        failure_modes: if result.failure_modes.is_empty() {
            None
        } else {
            Some(result.failure_modes.clone())
        },
    };
    write_canonical_file(&dir.join("match_summary.json"), &to_canonical_value(&summary)?)?;

    info!(dir = %dir.display(), match_id = %result.match_id, "match artifacts written");
    Ok(summary)
}

/// Run the verifier over a fresh match directory and store its report.
///
/// # Errors
///
/// Returns [`ArtifactError`] on serialization or I/O failure.
pub fn write_verification_result(dir: &Path) -> Result<(), ArtifactError> {
    let report = arena_verify::verify_match(dir);
    write_canonical_file(
        &dir.join("verification_result.json"),
        &to_canonical_value(&report)?,
    )
}

/// The agent with the strictly highest score; `None` on a draw.
fn winner_of(scores: &std::collections::BTreeMap<String, f64>) -> Option<String> {
    let best = scores.values().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut leaders = scores.iter().filter(|(_, s)| **s == best);
    let first = leaders.next()?;
    if leaders.next().is_some() {
        None
    } else {
        Some(first.0.clone())
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winner_requires_a_strict_maximum() {
        let scores = std::collections::BTreeMap::from([
            ("a".to_string(), 3.0),
            ("b".to_string(), 1.0),
        ]);
        assert_eq!(winner_of(&scores).as_deref(), Some("a"));

        let tied = std::collections::BTreeMap::from([
            ("a".to_string(), 2.0),
            ("b".to_string(), 2.0),
        ]);
        assert_eq!(winner_of(&tied), None);
    }

    #[test]
    fn agent_spec_hash_tracks_identity() {
        let a = agent_spec("x-0", "scripted", None, None, "1.0.0", None).unwrap();
        let same = agent_spec("x-0", "scripted", None, None, "1.0.0", None).unwrap();
        let different = agent_spec("x-0", "scripted", None, None, "1.0.1", None).unwrap();
        assert_eq!(a.content_hash, same.content_hash);
        assert_ne!(a.content_hash, different.content_hash);
    }
}
