// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command implementations.
//!
//! Everything here is a thin adapter: resolve keys, call the core,
//! write files, print a report. No command adds semantics the core
//! does not already define.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::info;

use arena_agents::{AGENT_VERSION, HttpGateway, TextAgent, register_scripted};
use arena_artifacts::{
    MatchContext, StatusWriter, agent_spec, scenario_ref, tournament_id, write_canonical_file,
    write_match_artifacts, write_tournament_artifacts, write_verification_result,
};
use arena_core::{
    DeterministicRng, MatchEndReason, MatchSummary, TournamentManifest, events_to_jsonl,
    hash_file, hash_manifest_core, storage_root, to_canonical_value,
};
use arena_receipt::{
    match_receipt_payload, sign_payload, signing_key_from_pem, tournament_receipt_payload,
    verify_receipt_against_key, verifying_key_from_pem,
};
use arena_runtime::{
    Agent, AgentRegistry, MatchConfig, Provenance, ScenarioRegistry, TournamentConfig, run_match,
    run_tournament,
};
use arena_scenarios::{SCENARIO_CONTRACT_VERSION, register_builtins};
use arena_verify::{BundleOptions, validate_bundle, verify_match, verify_tournament};

use crate::GatewayArg;
use crate::render::{print_report, render_transcript};

/// Inputs to [`cmd_run_match`].
#[derive(Debug)]
pub(crate) struct RunMatchArgs {
    pub scenario: String,
    pub seed: u32,
    pub turns: u32,
    pub match_id: Option<String>,
    pub agents: Vec<String>,
    pub out_dir: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub gateway: GatewayArg,
    pub agent_urls: Vec<String>,
    pub emit_provenance: bool,
    pub engine_commit: Option<String>,
    pub engine_version: Option<String>,
}

fn registries() -> (ScenarioRegistry, AgentRegistry) {
    let mut scenarios = ScenarioRegistry::new();
    register_builtins(&mut scenarios);
    let mut agents = AgentRegistry::new();
    register_scripted(&mut agents);
    (scenarios, agents)
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) async fn cmd_run_match(args: RunMatchArgs) -> anyhow::Result<()> {
    let (scenarios, registry) = registries();
    let scenario = scenarios.get(&args.scenario)?;

    // Build the lineup plus its manifest entries.
    let mut instances: Vec<Box<dyn Agent>> = Vec::new();
    let mut specs = Vec::new();
    for (index, name) in args.agents.iter().enumerate() {
        let competitor_id = format!("{name}-{index}");
        match args.gateway {
            GatewayArg::Local => {
                let factory = registry.get(name)?;
                instances.push(factory.make(competitor_id.clone()));
                specs.push(agent_spec(
                    &competitor_id,
                    factory.kind.as_str(),
                    None,
                    None,
                    &factory.version,
                    None,
                )?);
            }
            GatewayArg::Http => {
                let url = args
                    .agent_urls
                    .get(index)
                    .with_context(|| format!("no --agent-urls entry for agent `{name}`"))?;
                let gateway = Arc::new(HttpGateway::new(url.clone()));
                instances.push(Box::new(TextAgent::new(competitor_id.clone(), gateway)));
                specs.push(agent_spec(
                    &competitor_id,
                    "llm",
                    Some("http".to_string()),
                    None,
                    AGENT_VERSION,
                    Some(json!({"url": url})),
                )?);
            }
        }
    }

    let provenance = args.emit_provenance.then(|| Provenance {
        engine_commit: args.engine_commit.clone(),
        engine_version: args
            .engine_version
            .clone()
            .or_else(|| Some(arena_core::RUNNER_VERSION.to_string())),
    });
    let config = MatchConfig {
        seed: args.seed,
        max_turns: args.turns,
        match_id: args.match_id.clone(),
        provenance,
        mode_profile: None,
        division_config: None,
        max_turn_time_ms: 0,
        max_consecutive_timeouts: 3,
    };

    // The directory is named by the match id, which is knowable up
    // front: the generator is the first consumer of the master stream.
    let match_id = args.match_id.clone().unwrap_or_else(|| {
        DeterministicRng::new(args.seed).generate_match_id()
    });
    let dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| storage_root().join("matches").join(&match_id));
    std::fs::create_dir_all(&dir)?;

    let status = StatusWriter::new(&dir);
    status.write_waiting(&match_id)?;

    let result = run_match(scenario.as_ref(), instances, &config, &status).await?;

    let ctx = MatchContext {
        scenario: scenario_ref(scenario.as_ref(), SCENARIO_CONTRACT_VERSION)?,
        agents: specs,
        mode_profile_id: "standard".to_string(),
        match_key: None,
        tournament_seed: None,
        max_turns: args.turns,
        git_commit: args.emit_provenance.then(|| args.engine_commit.clone()).flatten(),
    };
    let summary = write_match_artifacts(&dir, &result, &ctx)?;
    write_verification_result(&dir)?;
    if result.reason == MatchEndReason::SetupFailed {
        status.write_failed(
            &result.match_id,
            result.setup_error.as_deref().unwrap_or("setup failed"),
        )?;
    }

    if let Some(out) = &args.out {
        std::fs::write(out, events_to_jsonl(&result.events)?)?;
    }

    info!(match_id = %result.match_id, dir = %dir.display(), "match written");
    println!("match {} -> {}", result.match_id, dir.display());
    println!("reason: {}", serde_json::to_value(summary.reason)?);
    for (agent, score) in &summary.scores {
        println!("  {agent}: {score}");
    }
    Ok(())
}

pub(crate) async fn cmd_run_tournament(
    seed: u32,
    rounds: u32,
    max_turns: u32,
    scenario_key: String,
    agents: Vec<String>,
    out_dir: PathBuf,
    bundle_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (scenarios, registry) = registries();
    let scenario = scenarios.get(&scenario_key)?;

    let config = TournamentConfig {
        tournament_seed: seed,
        rounds,
        max_turns,
        max_turn_time_ms: 0,
        max_consecutive_timeouts: 3,
        agent_keys: agents,
        mode_profile: None,
    };
    let run = run_tournament(scenario.as_ref(), &registry, &config, &arena_runtime::NullObserver)
        .await?;
    let bundle = write_tournament_artifacts(
        &out_dir,
        &run,
        scenario.as_ref(),
        SCENARIO_CONTRACT_VERSION,
        &registry,
    )?;

    if let Some(path) = bundle_out {
        let digest = json!({
            "tournamentId": tournament_id(seed),
            "truthBundleHash": bundle.truth_bundle_hash,
            "matchCount": bundle.summaries.len(),
            "manifest": to_canonical_value(&bundle.manifest)?,
        });
        write_canonical_file(&path, &digest)?;
    }

    println!(
        "tournament {} -> {} ({} matches)",
        tournament_id(seed),
        out_dir.display(),
        bundle.summaries.len()
    );
    println!("truthBundleHash: {}", bundle.truth_bundle_hash);
    Ok(())
}

pub(crate) fn cmd_verify_match(path: &Path) -> i32 {
    let report = verify_match(path);
    print_report(&report, false);
    report.exit_code()
}

pub(crate) fn cmd_verify_tournament(path: &Path) -> i32 {
    let report = verify_tournament(path);
    print_report(&report, false);
    report.exit_code()
}

pub(crate) fn cmd_validate_bundle(path: &Path, require_signatures: bool, verbose: bool) -> i32 {
    let report = validate_bundle(
        path,
        &BundleOptions {
            require_signatures,
        },
    );
    print_report(&report, verbose);
    report.exit_code()
}

pub(crate) fn cmd_sign_tournament(dir: &Path, key_path: &Path, issuer: &str) -> anyhow::Result<()> {
    let pem = std::fs::read_to_string(key_path)
        .with_context(|| format!("failed to read key from {}", key_path.display()))?;
    let key = signing_key_from_pem(&pem)?;

    let manifest: TournamentManifest = serde_json::from_str(
        &std::fs::read_to_string(dir.join("tournament_manifest.json"))
            .context("failed to read tournament_manifest.json")?,
    )
    .context("tournament_manifest.json is malformed")?;

    let mut match_dirs: Vec<PathBuf> = std::fs::read_dir(dir.join("matches"))
        .context("matches/ is missing")?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    match_dirs.sort();

    let mut signed = 0usize;
    for match_dir in &match_dirs {
        let summary: MatchSummary = serde_json::from_str(
            &std::fs::read_to_string(match_dir.join("match_summary.json"))
                .with_context(|| format!("missing summary in {}", match_dir.display()))?,
        )?;
        let payload = match_receipt_payload(
            &summary.match_id,
            &summary.hashes.log_hash,
            &summary.hashes.manifest_hash,
            arena_core::RUNNER_VERSION,
            issuer,
        );
        let receipt = sign_payload(&payload, &key, Some(now_rfc3339()))?;
        write_canonical_file(&match_dir.join("receipt.json"), &to_canonical_value(&receipt)?)?;
        signed += 1;
    }

    let truth_bundle_hash = manifest
        .truth_bundle_hash
        .context("tournament manifest has no truthBundleHash; run the writer post-pass first")?;
    let payload = tournament_receipt_payload(
        &tournament_id(manifest.tournament_seed),
        &truth_bundle_hash,
        match_dirs.len(),
        issuer,
    );
    let receipt = sign_payload(&payload, &key, Some(now_rfc3339()))?;
    write_canonical_file(&dir.join("tournament_receipt.json"), &to_canonical_value(&receipt)?)?;

    println!("signed {signed} match receipts and 1 tournament receipt");
    Ok(())
}

pub(crate) fn cmd_verify_receipt(
    dir: &Path,
    public_key_path: &Path,
    match_key: Option<&str>,
    skip_hashes: bool,
) -> i32 {
    match verify_receipts_inner(dir, public_key_path, match_key, skip_hashes) {
        Ok(true) => {
            println!("receipts: PASS");
            0
        }
        Ok(false) => {
            println!("receipts: FAIL");
            1
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            2
        }
    }
}

fn verify_receipts_inner(
    dir: &Path,
    public_key_path: &Path,
    match_key: Option<&str>,
    skip_hashes: bool,
) -> anyhow::Result<bool> {
    let pem = std::fs::read_to_string(public_key_path)
        .with_context(|| format!("failed to read {}", public_key_path.display()))?;
    let verifying_key = verifying_key_from_pem(&pem)?;
    let mut all_ok = true;

    let mut match_dirs: Vec<PathBuf> = std::fs::read_dir(dir.join("matches"))
        .context("matches/ is missing")?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    match_dirs.sort();
    if let Some(wanted) = match_key {
        match_dirs.retain(|p| p.file_name().is_some_and(|n| n.to_string_lossy() == wanted));
        if match_dirs.is_empty() {
            bail!("no match directory named `{wanted}`");
        }
    }

    for match_dir in &match_dirs {
        let name = match_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let receipt: arena_receipt::Receipt = serde_json::from_str(
            &std::fs::read_to_string(match_dir.join("receipt.json"))
                .with_context(|| format!("missing receipt.json in matches/{name}"))?,
        )?;
        let mut ok = verify_receipt_against_key(&receipt, &verifying_key);
        if ok && !skip_hashes {
            let log_hash = hash_file(&match_dir.join("match.jsonl"))?;
            let manifest_value: Value = serde_json::from_str(&std::fs::read_to_string(
                match_dir.join("match_manifest.json"),
            )?)?;
            let manifest_hash = hash_manifest_core(&manifest_value)?;
            ok = receipt.payload.get("logHash").and_then(Value::as_str)
                == Some(log_hash.as_str())
                && receipt.payload.get("manifestHash").and_then(Value::as_str)
                    == Some(manifest_hash.as_str());
        }
        println!("matches/{name}: {}", if ok { "PASS" } else { "FAIL" });
        all_ok &= ok;
    }

    if match_key.is_none() {
        let receipt_path = dir.join("tournament_receipt.json");
        let receipt: arena_receipt::Receipt = serde_json::from_str(
            &std::fs::read_to_string(&receipt_path)
                .context("missing tournament_receipt.json")?,
        )?;
        let mut ok = verify_receipt_against_key(&receipt, &verifying_key);
        if ok && !skip_hashes {
            let mut log_hashes = Vec::new();
            for match_dir in &match_dirs {
                log_hashes.push(hash_file(&match_dir.join("match.jsonl"))?);
            }
            let recomputed = arena_core::truth_bundle_hash(&log_hashes);
            ok = receipt
                .payload
                .get("truthBundleHash")
                .and_then(Value::as_str)
                == Some(recomputed.as_str())
                && receipt.payload.get("matchCount").and_then(Value::as_u64)
                    == Some(match_dirs.len() as u64);
        }
        println!("tournament: {}", if ok { "PASS" } else { "FAIL" });
        all_ok &= ok;
    }

    Ok(all_ok)
}

pub(crate) fn cmd_replay_match(input: &Path, out_md: Option<&Path>) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let transcript = render_transcript(&text);
    match out_md {
        Some(path) => std::fs::write(path, transcript)?,
        None => print!("{transcript}"),
    }
    Ok(())
}
