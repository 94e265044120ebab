// SPDX-License-Identifier: MIT OR Apache-2.0
//! Determinism: the same inputs produce the same bytes, every time.

use serde_json::Value;

use arena_agents::register_scripted;
use arena_core::{MatchEventKind, events_to_jsonl, manifest_core};
use arena_runtime::{
    AgentRegistry, MatchConfig, NullObserver, TournamentConfig, run_match, run_tournament,
};
use arena_scenarios::{NumberGuessScenario, SCENARIO_CONTRACT_VERSION};

fn scripted_registry() -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    register_scripted(&mut registry);
    registry
}

fn lineup(registry: &AgentRegistry) -> Vec<Box<dyn arena_runtime::Agent>> {
    vec![
        registry.get("random").unwrap().make("random-0".into()),
        registry.get("baseline").unwrap().make("baseline-1".into()),
    ]
}

#[tokio::test]
async fn number_guess_match_is_byte_identical_across_runs() {
    let registry = scripted_registry();
    let config = MatchConfig {
        seed: 42,
        max_turns: 20,
        ..MatchConfig::default()
    };

    let first = run_match(&NumberGuessScenario, lineup(&registry), &config, &NullObserver)
        .await
        .unwrap();
    let second = run_match(&NumberGuessScenario, lineup(&registry), &config, &NullObserver)
        .await
        .unwrap();

    let first_bytes = events_to_jsonl(&first.events).unwrap();
    let second_bytes = events_to_jsonl(&second.events).unwrap();
    assert_eq!(first_bytes, second_bytes);

    // The opening event carries the configured seed.
    match &first.events[0].kind {
        MatchEventKind::MatchStarted { seed, .. } => assert_eq!(*seed, 42),
        other => panic!("first event should be MatchStarted, got {other:?}"),
    }

    // The stream closes with a MatchEnded whose reason is a normal end.
    match &first.events[first.events.len() - 1].kind {
        MatchEventKind::MatchEnded { reason, details, .. } => {
            let reason = serde_json::to_value(reason).unwrap();
            assert!(
                reason == "completed" || reason == "maxTurnsReached",
                "unexpected reason {reason}"
            );
            // The hidden number is revealed, but only under _private.
            let secret = details
                .as_ref()
                .and_then(|d| d.get("_private"))
                .and_then(|p| p.get("secretNumber"));
            assert!(
                secret.is_some_and(Value::is_number),
                "details._private.secretNumber should be a number"
            );
        }
        other => panic!("last event should be MatchEnded, got {other:?}"),
    }

    // Public summaries never leak the secret.
    for event in &first.events {
        if let MatchEventKind::StateUpdated { summary, .. } = &event.kind {
            assert!(summary.get("secretNumber").is_none());
        }
    }
}

#[tokio::test]
async fn tournament_reruns_produce_identical_truth_files() {
    let registry = scripted_registry();
    let config = TournamentConfig {
        tournament_seed: 101,
        rounds: 2,
        max_turns: 20,
        agent_keys: vec!["random".into(), "baseline".into()],
        ..TournamentConfig::default()
    };

    let first = run_tournament(&NumberGuessScenario, &registry, &config, &NullObserver)
        .await
        .unwrap();
    let second = run_tournament(&NumberGuessScenario, &registry, &config, &NullObserver)
        .await
        .unwrap();

    assert_eq!(first.records.len(), second.records.len());
    for (a, b) in first.records.iter().zip(&second.records) {
        assert_eq!(a.planned, b.planned);
        assert_eq!(
            events_to_jsonl(&a.result.events).unwrap(),
            events_to_jsonl(&b.result.events).unwrap()
        );
    }
}

#[tokio::test]
async fn tournament_bundles_agree_modulo_timestamps() {
    let registry = scripted_registry();
    let config = TournamentConfig {
        tournament_seed: 7,
        rounds: 1,
        max_turns: 20,
        agent_keys: vec!["random".into(), "baseline".into()],
        ..TournamentConfig::default()
    };

    let mut manifests = Vec::new();
    let mut standings = Vec::new();
    let mut bundle_hashes = Vec::new();
    for _ in 0..2 {
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
        let manifest: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("tournament_manifest.json")).unwrap(),
        )
        .unwrap();
        // createdAt is the one sanctioned difference between reruns;
        // the manifest core must match byte for byte.
        bundle_hashes.push(manifest["truthBundleHash"].clone());
        manifests.push(arena_core::canonicalize(&manifest_core(&manifest)).unwrap());
        standings.push(std::fs::read_to_string(dir.path().join("standings.json")).unwrap());
    }
    assert_eq!(manifests[0], manifests[1]);
    assert_eq!(standings[0], standings[1]);
    assert_eq!(bundle_hashes[0], bundle_hashes[1]);
    assert!(bundle_hashes[0].is_string());
}
