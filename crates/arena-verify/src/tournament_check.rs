// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-tournament verification.
//!
//! Structural layout, per-match verification, the byte-identical
//! `tournament.json` alias, and the truth-bundle recomputation.

use std::path::{Path, PathBuf};

use arena_core::{TournamentManifest, hash_file, truth_bundle_hash};

use crate::match_check::{read_json, verify_match};
use crate::report::{CheckBuilder, VerificationReport};

/// Verify one tournament directory.
#[must_use]
pub fn verify_tournament(dir: &Path) -> VerificationReport {
    let mut structure = CheckBuilder::new("structure");
    for name in ["tournament_manifest.json", "tournament.json", "standings.json"] {
        if !dir.join(name).is_file() {
            structure.structural(format!("missing required file `{name}`"));
        }
    }
    let match_dirs = list_match_dirs(dir);
    if match_dirs.is_empty() {
        structure.structural("matches/ is missing or empty");
    }
    if structure.has_errors() {
        return VerificationReport::new(dir.display().to_string(), vec![structure.finish()]);
    }

    // The alias must be byte-identical to the manifest.
    let manifest_bytes = std::fs::read(dir.join("tournament_manifest.json")).unwrap_or_default();
    let alias_bytes = std::fs::read(dir.join("tournament.json")).unwrap_or_default();
    if manifest_bytes != alias_bytes {
        structure.error("tournament.json is not byte-identical to tournament_manifest.json");
    }
    let structure = structure.finish();

    let mut matches = CheckBuilder::new("matches");
    let mut log_hashes = Vec::new();
    for match_dir in &match_dirs {
        let report = verify_match(match_dir);
        if !report.passed() {
            for check in &report.checks {
                for error in &check.errors {
                    matches.error(format!("{}: {error}", match_dir.display()));
                }
            }
        }
        match hash_file(&match_dir.join("match.jsonl")) {
            Ok(hash) => log_hashes.push(hash),
            Err(e) => matches.structural(format!(
                "{}: failed to hash match.jsonl: {e}",
                match_dir.display()
            )),
        }
    }
    let matches = matches.finish();

    let mut tournament_hash = CheckBuilder::new("tournamentHash");
    match read_json(dir, "tournament_manifest.json") {
        Ok(value) => match serde_json::from_value::<TournamentManifest>(value) {
            Ok(manifest) => {
                let recomputed = truth_bundle_hash(&log_hashes);
                match manifest.truth_bundle_hash {
                    Some(stored) if stored == recomputed => {}
                    Some(stored) => tournament_hash.error(format!(
                        "truthBundleHash mismatch: stored {stored}, recomputed {recomputed}"
                    )),
                    None => tournament_hash.error("truthBundleHash is absent from the manifest"),
                }
            }
            Err(e) => {
                tournament_hash.structural(format!("tournament_manifest.json is malformed: {e}"));
            }
        },
        Err(e) => tournament_hash.structural(e),
    }

    VerificationReport::new(
        dir.display().to_string(),
        vec![structure, matches, tournament_hash.finish()],
    )
}

/// Sorted list of `matches/*` subdirectories.
pub(crate) fn list_match_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir.join("matches"))
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default();
    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CheckStatus;

    #[test]
    fn empty_directory_is_a_structural_error() {
        let dir = tempfile::tempdir().unwrap();
        let report = verify_tournament(dir.path());
        assert_eq!(report.status, CheckStatus::Error);
        assert_eq!(report.exit_code(), 2);
    }
}
