// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bundle validation: the seven named checks.
//!
//! `structure`, `crossReferences`, `contentHashes`, `tournamentHash`,
//! `standings`, `broadcastManifest`, and `signatures`, in that order.
//! Structure problems end the run early (nothing else is meaningful);
//! every other check runs to completion so a report shows the full
//! damage, not just the first hit.

use std::collections::BTreeSet;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use arena_core::{
    BroadcastManifest, FileClass, MatchSummary, StandingsRow, TournamentManifest,
    compute_standings, hash_file, hash_manifest_core, truth_bundle_hash,
};
use arena_receipt::{Receipt, verify_receipt};

use crate::match_check::{REQUIRED_MATCH_FILES, read_json, verify_match};
use crate::report::{CheckBuilder, VerificationReport};
use crate::tournament_check::list_match_dirs;

/// Junk files tolerated without a broadcast-manifest listing.
const UNLISTED_ALLOWLIST: [&str; 7] = [
    "broadcast_manifest.json",
    "tournament_receipt.json",
    "receipt.json",
    "verification_result.json",
    "match_status.json",
    ".DS_Store",
    "thumbs.db",
];

/// Knobs for [`validate_bundle`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleOptions {
    /// Treat missing receipts as errors instead of warnings.
    pub require_signatures: bool,
}

/// Run all seven checks over a tournament bundle.
#[must_use]
pub fn validate_bundle(dir: &Path, options: &BundleOptions) -> VerificationReport {
    // ── 1. structure ────────────────────────────────────────────────
    let mut structure = CheckBuilder::new("structure");
    for name in ["tournament_manifest.json", "standings.json"] {
        if !dir.join(name).is_file() {
            structure.structural(format!("missing required file `{name}`"));
        }
    }
    let match_dirs = list_match_dirs(dir);
    if match_dirs.is_empty() {
        structure.structural("matches/ is missing or empty");
    }
    for match_dir in &match_dirs {
        for name in REQUIRED_MATCH_FILES {
            if !match_dir.join(name).is_file() {
                structure.structural(format!(
                    "{}: missing required file `{name}`",
                    match_dir.display()
                ));
            }
        }
    }
    if structure.has_errors() {
        return VerificationReport::new(dir.display().to_string(), vec![structure.finish()]);
    }
    let structure = structure.finish();

    let manifest: Option<TournamentManifest> = read_json(dir, "tournament_manifest.json")
        .ok()
        .and_then(|v| serde_json::from_value(v).ok());

    // Per-directory summaries, keyed by directory name.
    let mut summaries: Vec<(String, MatchSummary)> = Vec::new();

    // ── 2. crossReferences ──────────────────────────────────────────
    let mut cross = CheckBuilder::new("crossReferences");
    let dir_names: BTreeSet<String> = match_dirs
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    if let Some(manifest) = &manifest {
        let mut referenced = BTreeSet::new();
        for entry in &manifest.matches {
            referenced.insert(entry.match_key.clone());
            if !dir_names.contains(&entry.match_key) {
                cross.error(format!(
                    "manifest lists `{}` but matches/ has no such directory",
                    entry.match_key
                ));
            }
        }
        for name in &dir_names {
            if !referenced.contains(name) {
                cross.warning(format!("matches/{name} is not referenced by the manifest"));
            }
        }
    } else {
        cross.structural("tournament_manifest.json is missing or malformed");
    }
    for match_dir in &match_dirs {
        let dir_name = match_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match read_json(match_dir, "match_summary.json")
            .and_then(|v| serde_json::from_value::<MatchSummary>(v).map_err(|e| e.to_string()))
        {
            Ok(summary) => {
                if summary.match_key.as_deref() != Some(dir_name.as_str()) {
                    cross.error(format!(
                        "matches/{dir_name}: summary matchKey is {:?}",
                        summary.match_key
                    ));
                }
                if let Ok(manifest_value) = read_json(match_dir, "match_manifest.json")
                    && let Some(manifest_id) =
                        manifest_value.get("matchId").and_then(Value::as_str)
                    && manifest_id != summary.match_id
                {
                    cross.error(format!(
                        "matches/{dir_name}: summary matchId `{}` differs from manifest `{manifest_id}`",
                        summary.match_id
                    ));
                }
                summaries.push((dir_name, summary));
            }
            Err(e) => cross.structural(format!("matches/{dir_name}: {e}")),
        }
    }
    let cross = cross.finish();

    // ── 3. contentHashes ────────────────────────────────────────────
    let mut hashes = CheckBuilder::new("contentHashes");
    let mut log_hashes = Vec::new();
    for match_dir in &match_dirs {
        let report = verify_match(match_dir);
        if !report.passed() {
            for check in &report.checks {
                for error in &check.errors {
                    hashes.error(format!("{}: {error}", match_dir.display()));
                }
            }
        }
        if let Ok(hash) = hash_file(&match_dir.join("match.jsonl")) {
            log_hashes.push(hash);
        }
    }
    let hashes = hashes.finish();

    // ── 4. tournamentHash ───────────────────────────────────────────
    let mut tournament_hash = CheckBuilder::new("tournamentHash");
    let recomputed_bundle_hash = truth_bundle_hash(&log_hashes);
    match manifest.as_ref().and_then(|m| m.truth_bundle_hash.clone()) {
        Some(stored) if stored == recomputed_bundle_hash => {}
        Some(stored) => tournament_hash.error(format!(
            "truthBundleHash mismatch: stored {stored}, recomputed {recomputed_bundle_hash}"
        )),
        None => tournament_hash.error("truthBundleHash is absent from the manifest"),
    }
    if dir.join("tournament.json").is_file() {
        let manifest_bytes =
            std::fs::read(dir.join("tournament_manifest.json")).unwrap_or_default();
        let alias_bytes = std::fs::read(dir.join("tournament.json")).unwrap_or_default();
        if manifest_bytes != alias_bytes {
            tournament_hash
                .error("tournament.json is not byte-identical to tournament_manifest.json");
        }
    } else {
        tournament_hash.warning("tournament.json alias is absent");
    }
    let tournament_hash = tournament_hash.finish();

    // ── 5. standings ────────────────────────────────────────────────
    let mut standings = CheckBuilder::new("standings");
    match read_json(dir, "standings.json")
        .and_then(|v| serde_json::from_value::<Vec<StandingsRow>>(v).map_err(|e| e.to_string()))
    {
        Ok(stored) => {
            let all: Vec<MatchSummary> = summaries.iter().map(|(_, s)| s.clone()).collect();
            let recomputed = compute_standings(&all);
            if stored != recomputed {
                standings.error(format!(
                    "standings diverge: stored {} rows, recomputed {} rows or different content",
                    stored.len(),
                    recomputed.len()
                ));
            }
        }
        Err(e) => standings.structural(e),
    }
    let standings = standings.finish();

    // ── 6. broadcastManifest ────────────────────────────────────────
    let broadcast = check_broadcast_manifest(dir, &recomputed_bundle_hash);

    // ── 7. signatures ───────────────────────────────────────────────
    let signatures =
        check_signatures(dir, &match_dirs, &summaries, &recomputed_bundle_hash, options);

    VerificationReport::new(
        dir.display().to_string(),
        vec![
            structure,
            cross,
            hashes,
            tournament_hash,
            standings,
            broadcast,
            signatures,
        ],
    )
}

fn check_broadcast_manifest(dir: &Path, recomputed_bundle_hash: &str) -> crate::report::CheckResult {
    let mut check = CheckBuilder::new("broadcastManifest");
    if !dir.join("broadcast_manifest.json").is_file() {
        check.warning("broadcast_manifest.json is absent");
        return check.finish();
    }

    let manifest: Option<BroadcastManifest> = read_json(dir, "broadcast_manifest.json")
        .ok()
        .and_then(|v| serde_json::from_value(v).ok());
    let Some(manifest) = manifest else {
        check.structural("broadcast_manifest.json is malformed");
        return check.finish();
    };

    let expected_truth = expected_truth_files(dir);
    let mut listed = BTreeSet::new();
    for entry in &manifest.files {
        listed.insert(entry.path.clone());
        let path = dir.join(&entry.path);
        if !path.is_file() {
            check.error(format!("listed file `{}` does not exist", entry.path));
            continue;
        }
        if let Some(stored) = &entry.content_hash {
            match hash_file(&path) {
                Ok(recomputed) if &recomputed == stored => {}
                Ok(recomputed) => check.error(format!(
                    "`{}` contentHash mismatch: stored {stored}, recomputed {recomputed}",
                    entry.path
                )),
                Err(e) => check.error(format!("failed to hash `{}`: {e}", entry.path)),
            }
        } else if entry.class == FileClass::Truth {
            check.warning(format!("truth file `{}` has no contentHash", entry.path));
        }
        // Classification drift is a warning, never an error: older
        // producers classified these files differently.
        let should_be_truth = expected_truth.contains(&entry.path);
        if should_be_truth && entry.class != FileClass::Truth {
            check.warning(format!("`{}` should be classified truth", entry.path));
        }
        if !should_be_truth && entry.class == FileClass::Truth {
            check.warning(format!("`{}` is classified truth unexpectedly", entry.path));
        }
    }

    if manifest.truth_bundle_hash != recomputed_bundle_hash {
        check.warning(format!(
            "broadcast truthBundleHash `{}` differs from recomputed `{recomputed_bundle_hash}`",
            manifest.truth_bundle_hash
        ));
    }

    for file in walk_files(dir) {
        if listed.contains(&file) {
            continue;
        }
        let basename = file.rsplit('/').next().unwrap_or(&file);
        if !UNLISTED_ALLOWLIST.contains(&basename) {
            check.warning(format!("`{file}` is not listed in the broadcast manifest"));
        }
    }

    check.finish()
}

fn check_signatures(
    dir: &Path,
    match_dirs: &[std::path::PathBuf],
    summaries: &[(String, MatchSummary)],
    recomputed_bundle_hash: &str,
    options: &BundleOptions,
) -> crate::report::CheckResult {
    let mut check = CheckBuilder::new("signatures");

    for match_dir in match_dirs {
        let dir_name = match_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let receipt_path = match_dir.join("receipt.json");
        if !receipt_path.is_file() {
            if options.require_signatures {
                check.structural(format!("matches/{dir_name}: receipt.json is absent"));
            } else {
                check.warning(format!("matches/{dir_name}: receipt.json is absent"));
            }
            continue;
        }
        let receipt: Option<Receipt> = read_json(match_dir, "receipt.json")
            .ok()
            .and_then(|v| serde_json::from_value(v).ok());
        let Some(receipt) = receipt else {
            check.error(format!("matches/{dir_name}: receipt.json is malformed"));
            continue;
        };
        if !verify_receipt(&receipt) {
            check.error(format!("matches/{dir_name}: signature is invalid"));
            continue;
        }
        debug!(match_dir = %dir_name, "receipt signature verified");
        // Bind the payload to the filesystem.
        let payload = &receipt.payload;
        if let Ok(log_hash) = hash_file(&match_dir.join("match.jsonl"))
            && payload.get("logHash").and_then(Value::as_str) != Some(log_hash.as_str())
        {
            check.error(format!(
                "matches/{dir_name}: receipt logHash differs from the recomputed log hash"
            ));
        }
        if let Ok(manifest_value) = read_json(match_dir, "match_manifest.json")
            && let Ok(manifest_hash) = hash_manifest_core(&manifest_value)
            && payload.get("manifestHash").and_then(Value::as_str)
                != Some(manifest_hash.as_str())
        {
            check.error(format!(
                "matches/{dir_name}: receipt manifestHash differs from the recomputed manifest hash"
            ));
        }
        if let Some((_, summary)) = summaries.iter().find(|(name, _)| name == &dir_name)
            && payload.get("matchId").and_then(Value::as_str) != Some(summary.match_id.as_str())
        {
            check.error(format!("matches/{dir_name}: receipt matchId differs from the summary"));
        }
    }

    let tournament_receipt_path = dir.join("tournament_receipt.json");
    if tournament_receipt_path.is_file() {
        let receipt: Option<Receipt> = read_json(dir, "tournament_receipt.json")
            .ok()
            .and_then(|v| serde_json::from_value(v).ok());
        match receipt {
            Some(receipt) if verify_receipt(&receipt) => {
                let payload = &receipt.payload;
                if payload.get("truthBundleHash").and_then(Value::as_str)
                    != Some(recomputed_bundle_hash)
                {
                    check.error(
                        "tournament receipt truthBundleHash differs from the recomputed value",
                    );
                }
                let match_count = payload.get("matchCount").and_then(Value::as_u64);
                if match_count != Some(match_dirs.len() as u64) {
                    check.error(format!(
                        "tournament receipt matchCount {match_count:?} differs from {} match directories",
                        match_dirs.len()
                    ));
                }
            }
            Some(_) => check.error("tournament receipt signature is invalid"),
            None => check.error("tournament_receipt.json is malformed"),
        }
    } else if options.require_signatures {
        check.structural("tournament_receipt.json is absent");
    } else {
        check.warning("tournament_receipt.json is absent");
    }

    check.finish()
}

/// The closed set of files expected to carry the `truth` class.
fn expected_truth_files(dir: &Path) -> BTreeSet<String> {
    let mut expected = BTreeSet::new();
    expected.insert("tournament_manifest.json".to_string());
    expected.insert("tournament.json".to_string());
    for match_dir in list_match_dirs(dir) {
        if let Some(name) = match_dir.file_name().map(|n| n.to_string_lossy()) {
            expected.insert(format!("matches/{name}/match.jsonl"));
            expected.insert(format!("matches/{name}/match_manifest.json"));
        }
    }
    expected
}

/// Every file under `dir`, as `/`-separated relative paths.
fn walk_files(dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if let Ok(relative) = path.strip_prefix(dir) {
                files.push(
                    relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/"),
                );
            }
        }
    }
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CheckStatus;

    #[test]
    fn empty_directory_is_structural() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate_bundle(dir.path(), &BundleOptions::default());
        assert_eq!(report.status, CheckStatus::Error);
        assert_eq!(report.exit_code(), 2);
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].name, "structure");
    }
}
