// SPDX-License-Identifier: MIT OR Apache-2.0
//! Receipt signing over a freshly produced bundle, and the whole chain
//! breaking when a single byte of truth changes.

use ed25519_dalek::SigningKey;

use arena_agents::register_scripted;
use arena_artifacts::{tournament_id, write_canonical_file};
use arena_core::{MatchSummary, TournamentManifest, to_canonical_value};
use arena_receipt::{
    Receipt, match_receipt_payload, sign_payload, tournament_receipt_payload, verify_receipt,
    verify_receipt_against_key,
};
use arena_runtime::{AgentRegistry, NullObserver, TournamentConfig, run_tournament};
use arena_scenarios::{NumberGuessScenario, SCENARIO_CONTRACT_VERSION};
use arena_verify::{BundleOptions, CheckStatus, validate_bundle};

fn test_key() -> SigningKey {
    SigningKey::from_bytes(&[42u8; 32])
}

async fn write_signed_bundle(dir: &std::path::Path) -> usize {
    let mut registry = AgentRegistry::new();
    register_scripted(&mut registry);
    let config = TournamentConfig {
        tournament_seed: 77,
        rounds: 1,
        max_turns: 20,
        agent_keys: vec!["random".into(), "baseline".into()],
        ..TournamentConfig::default()
    };
    let run = run_tournament(&NumberGuessScenario, &registry, &config, &NullObserver)
        .await
        .unwrap();
    arena_artifacts::write_tournament_artifacts(
        dir,
        &run,
        &NumberGuessScenario,
        SCENARIO_CONTRACT_VERSION,
        &registry,
    )
    .unwrap();

    // Sign every match, then the tournament.
    let key = test_key();
    let mut match_dirs: Vec<_> = std::fs::read_dir(dir.join("matches"))
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    match_dirs.sort();
    for match_dir in &match_dirs {
        let summary: MatchSummary = serde_json::from_str(
            &std::fs::read_to_string(match_dir.join("match_summary.json")).unwrap(),
        )
        .unwrap();
        let payload = match_receipt_payload(
            &summary.match_id,
            &summary.hashes.log_hash,
            &summary.hashes.manifest_hash,
            arena_core::RUNNER_VERSION,
            "integration-test",
        );
        let receipt = sign_payload(&payload, &key, None).unwrap();
        write_canonical_file(
            &match_dir.join("receipt.json"),
            &to_canonical_value(&receipt).unwrap(),
        )
        .unwrap();
    }

    let manifest: TournamentManifest = serde_json::from_str(
        &std::fs::read_to_string(dir.join("tournament_manifest.json")).unwrap(),
    )
    .unwrap();
    let payload = tournament_receipt_payload(
        &tournament_id(manifest.tournament_seed),
        manifest.truth_bundle_hash.as_deref().unwrap(),
        match_dirs.len(),
        "integration-test",
    );
    let receipt = sign_payload(&payload, &key, None).unwrap();
    write_canonical_file(
        &dir.join("tournament_receipt.json"),
        &to_canonical_value(&receipt).unwrap(),
    )
    .unwrap();

    match_dirs.len()
}

#[tokio::test]
async fn signed_bundle_validates_with_required_signatures() {
    let dir = tempfile::tempdir().unwrap();
    let match_count = write_signed_bundle(dir.path()).await;
    assert!(match_count >= 1);

    let report = validate_bundle(
        dir.path(),
        &BundleOptions {
            require_signatures: true,
        },
    );
    assert!(report.passed(), "signed bundle must validate: {report:?}");

    // Every receipt also verifies against the pinned public key.
    let verifying_key = test_key().verifying_key();
    for entry in std::fs::read_dir(dir.path().join("matches")).unwrap() {
        let receipt: Receipt = serde_json::from_str(
            &std::fs::read_to_string(entry.unwrap().path().join("receipt.json")).unwrap(),
        )
        .unwrap();
        assert!(verify_receipt(&receipt));
        assert!(verify_receipt_against_key(&receipt, &verifying_key));
    }
}

#[tokio::test]
async fn unsigned_bundle_fails_only_under_require_signatures() {
    let mut registry = AgentRegistry::new();
    register_scripted(&mut registry);
    let config = TournamentConfig {
        tournament_seed: 78,
        rounds: 1,
        max_turns: 20,
        agent_keys: vec!["random".into(), "baseline".into()],
        ..TournamentConfig::default()
    };
    let run = run_tournament(&NumberGuessScenario, &registry, &config, &NullObserver)
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    arena_artifacts::write_tournament_artifacts(
        dir.path(),
        &run,
        &NumberGuessScenario,
        SCENARIO_CONTRACT_VERSION,
        &registry,
    )
    .unwrap();

    let lenient = validate_bundle(dir.path(), &BundleOptions::default());
    assert!(lenient.passed());

    let strict = validate_bundle(
        dir.path(),
        &BundleOptions {
            require_signatures: true,
        },
    );
    assert!(!strict.passed());
}

#[tokio::test]
async fn flipping_truth_bytes_breaks_the_receipt_chain() {
    let dir = tempfile::tempdir().unwrap();
    write_signed_bundle(dir.path()).await;

    let match_dir = std::fs::read_dir(dir.path().join("matches"))
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let log_path = match_dir.join("match.jsonl");
    let mut bytes = std::fs::read(&log_path).unwrap();
    bytes[7] ^= 0x01;
    std::fs::write(&log_path, bytes).unwrap();

    let report = validate_bundle(
        dir.path(),
        &BundleOptions {
            require_signatures: true,
        },
    );
    assert_eq!(report.exit_code(), 1);
    let signatures = report
        .checks
        .iter()
        .find(|c| c.name == "signatures")
        .unwrap();
    // The signature still verifies cryptographically, but its payload
    // no longer matches the bytes on disk.
    assert_eq!(signatures.status, CheckStatus::Fail);
    assert!(
        signatures
            .errors
            .iter()
            .any(|e| e.contains("logHash"))
    );
}

#[test]
fn receipt_payload_shapes_are_stable() {
    let match_payload =
        match_receipt_payload("m1", "sha256:aa", "sha256:bb", "0.1.0", "issuer");
    let expected: Vec<&str> = vec!["issuedBy", "logHash", "manifestHash", "matchId", "runnerVersion"];
    let keys: Vec<&str> = match_payload
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, expected);

    let tournament_payload = tournament_receipt_payload("t1", "cc", 3, "issuer");
    assert_eq!(
        tournament_payload,
        serde_json::json!({
            "tournamentId": "t1",
            "truthBundleHash": "cc",
            "matchCount": 3,
            "issuedBy": "issuer",
        })
    );
}
