// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tournament bundle writing and the truth-bundle post-pass.
//!
//! The bundle is written in two passes. First every per-match
//! directory, the standings, and a manifest whose `truthBundleHash` is
//! still null. Then the post-pass collects every `match.jsonl` hash,
//! computes the fingerprint, and rewrites `tournament_manifest.json`
//! and its byte-identical `tournament.json` alias. The broadcast
//! manifest goes last because it hashes the final manifest bytes.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use arena_core::{
    MatchSummary, TournamentManifest, TournamentMatchEntry, compute_standings, to_canonical_value,
    truth_bundle_hash,
};
use arena_runtime::{AgentRegistry, Scenario, TournamentRun};

use crate::broadcast::build_broadcast_manifest;
use crate::match_dir::{
    MatchContext, agent_spec, now_rfc3339, scenario_ref, write_match_artifacts,
    write_verification_result,
};
use crate::write::{ArtifactError, write_canonical_file};

/// Everything a caller needs after a bundle is on disk.
#[derive(Debug)]
pub struct TournamentBundle {
    /// The final manifest, post-pass applied.
    pub manifest: TournamentManifest,
    /// Per-match summaries, in schedule order.
    pub summaries: Vec<MatchSummary>,
    /// The computed truth-bundle hash.
    pub truth_bundle_hash: String,
}

/// Stable bundle identifier for a tournament.
#[must_use]
pub fn tournament_id(tournament_seed: u32) -> String {
    format!("tournament-{tournament_seed}")
}

/// Write a complete tournament bundle into `dir`.
///
/// # Errors
///
/// Returns [`ArtifactError`] on serialization, resolution, or I/O
/// failure.
pub fn write_tournament_artifacts(
    dir: &Path,
    run: &TournamentRun,
    scenario: &dyn Scenario,
    contract_version: &str,
    agents: &AgentRegistry,
) -> Result<TournamentBundle, ArtifactError> {
    std::fs::create_dir_all(dir.join("matches"))?;
    let scenario_entry = scenario_ref(scenario, contract_version)?;
    let mode_profile_id = run
        .config
        .mode_profile
        .clone()
        .unwrap_or_else(|| "standard".to_string());

    // Pass 1: per-match directories.
    let mut summaries = Vec::with_capacity(run.records.len());
    for record in &run.records {
        let match_dir = dir.join("matches").join(&record.planned.match_key);
        let mut specs = Vec::with_capacity(record.planned.seats.len());
        for seat in &record.planned.seats {
            let factory = agents.get(&seat.agent_key)?;
            specs.push(agent_spec(
                &seat.competitor_id,
                factory.kind.as_str(),
                None,
                None,
                &factory.version,
                None,
            )?);
        }
        let ctx = MatchContext {
            scenario: scenario_entry.clone(),
            agents: specs,
            mode_profile_id: mode_profile_id.clone(),
            match_key: Some(record.planned.match_key.clone()),
            tournament_seed: Some(run.config.tournament_seed),
            max_turns: run.config.max_turns,
            git_commit: None,
        };
        let summary = write_match_artifacts(&match_dir, &record.result, &ctx)?;
        write_verification_result(&match_dir)?;
        summaries.push(summary);
    }

    // Standings from the summaries just written.
    let standings = compute_standings(&summaries);
    write_canonical_file(&dir.join("standings.json"), &to_canonical_value(&standings)?)?;

    // Manifest, truthBundleHash still null.
    let mut manifest = TournamentManifest {
        tournament_seed: run.config.tournament_seed,
        scenario_name: run.scenario_name.clone(),
        agents: run.competitor_ids.clone(),
        matches: run
            .records
            .iter()
            .map(|r| TournamentMatchEntry {
                match_key: r.planned.match_key.clone(),
                seed: r.planned.seed,
                scenario_name: run.scenario_name.clone(),
                agent_ids: r.planned.agent_ids(),
                max_turns: run.config.max_turns,
            })
            .collect(),
        mode_profile: run.config.mode_profile.clone(),
        harness_version: Some(arena_core::RUNNER_VERSION.to_string()),
        truth_bundle_hash: None,
        created_at: now_rfc3339(),
    };
    write_manifest_pair(dir, &manifest)?;

    // Post-pass: every per-match hash exists now.
    let log_hashes: Vec<String> = summaries
        .iter()
        .map(|s| s.hashes.log_hash.clone())
        .collect();
    let bundle_hash = truth_bundle_hash(&log_hashes);
    manifest.truth_bundle_hash = Some(bundle_hash.clone());
    write_manifest_pair(dir, &manifest)?;

    // Broadcast manifest hashes the final bytes, so it goes last.
    let broadcast = build_broadcast_manifest(
        dir,
        &tournament_id(run.config.tournament_seed),
        &mode_profile_id,
        &bundle_hash,
    )?;
    write_canonical_file(
        &dir.join("broadcast_manifest.json"),
        &to_canonical_value(&broadcast)?,
    )?;

    info!(
        dir = %dir.display(),
        matches = summaries.len(),
        truth_bundle_hash = %bundle_hash,
        "tournament bundle written"
    );

    Ok(TournamentBundle {
        manifest,
        summaries,
        truth_bundle_hash: bundle_hash,
    })
}

/// Write the manifest and its alias with identical bytes.
fn write_manifest_pair(dir: &Path, manifest: &TournamentManifest) -> Result<(), ArtifactError> {
    let value: Value = to_canonical_value(manifest)?;
    write_canonical_file(&dir.join("tournament_manifest.json"), &value)?;
    write_canonical_file(&dir.join("tournament.json"), &value)?;
    Ok(())
}
