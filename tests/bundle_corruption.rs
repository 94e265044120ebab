// SPDX-License-Identifier: MIT OR Apache-2.0
//! The bundle validator against a corrupted bundle: a single flipped
//! byte fails the content and tournament hash checks while the
//! structural checks stay green.

use arena_agents::register_scripted;
use arena_runtime::{AgentRegistry, NullObserver, TournamentConfig, run_tournament};
use arena_scenarios::{NumberGuessScenario, SCENARIO_CONTRACT_VERSION};
use arena_verify::{BundleOptions, CheckStatus, validate_bundle};

async fn write_bundle(dir: &std::path::Path) {
    let mut registry = AgentRegistry::new();
    register_scripted(&mut registry);
    let config = TournamentConfig {
        tournament_seed: 55,
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
}

fn check<'a>(
    report: &'a arena_verify::VerificationReport,
    name: &str,
) -> &'a arena_verify::CheckResult {
    report
        .checks
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("missing check `{name}`"))
}

#[tokio::test]
async fn flipped_byte_fails_hash_checks_but_not_structure() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path()).await;

    // Sanity: the pristine bundle validates.
    let clean = validate_bundle(dir.path(), &BundleOptions::default());
    assert!(clean.passed(), "pristine bundle should pass: {clean:?}");

    // Flip one byte in the first match log.
    let match_dir = std::fs::read_dir(dir.path().join("matches"))
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let log_path = match_dir.join("match.jsonl");
    let mut bytes = std::fs::read(&log_path).unwrap();
    bytes[10] ^= 0x01;
    std::fs::write(&log_path, bytes).unwrap();

    let report = validate_bundle(dir.path(), &BundleOptions::default());
    assert_eq!(check(&report, "structure").status, CheckStatus::Pass);
    assert_eq!(check(&report, "contentHashes").status, CheckStatus::Fail);
    assert_eq!(check(&report, "tournamentHash").status, CheckStatus::Fail);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn removing_a_required_file_is_structural() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path()).await;

    std::fs::remove_file(dir.path().join("standings.json")).unwrap();
    let report = validate_bundle(dir.path(), &BundleOptions::default());
    assert_eq!(report.exit_code(), 2);
}

#[tokio::test]
async fn unreferenced_match_directory_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path()).await;

    // Clone an existing match directory under an unlisted key.
    let source = std::fs::read_dir(dir.path().join("matches"))
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let stray = dir.path().join("matches").join("stray-key");
    std::fs::create_dir_all(&stray).unwrap();
    for entry in std::fs::read_dir(&source).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), stray.join(entry.file_name())).unwrap();
    }

    let report = validate_bundle(dir.path(), &BundleOptions::default());
    let cross = check(&report, "crossReferences");
    // The stray directory warns; its summary also carries the wrong
    // matchKey for its directory, which is a real mismatch.
    assert!(
        cross
            .warnings
            .iter()
            .any(|w| w.contains("stray-key"))
            || cross.errors.iter().any(|e| e.contains("stray-key"))
    );
}
