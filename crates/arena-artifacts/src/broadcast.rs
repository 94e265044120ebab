// SPDX-License-Identifier: MIT OR Apache-2.0
//! Broadcast manifest construction.
//!
//! Enumerates every bundle-visible file with its class: `truth` files
//! carry content hashes (they are authoritative for reproduction),
//! `telemetry` and `show` files do not. Built after the truth-bundle
//! post-pass so the hashes cover the final bytes.

use std::path::Path;

use arena_core::{BroadcastFileEntry, BroadcastManifest, FileClass, RUNNER_NAME, RUNNER_VERSION,
    hash_file};

use crate::write::ArtifactError;

/// Build the broadcast manifest for a tournament bundle on disk.
///
/// # Errors
///
/// Returns [`ArtifactError`] if a truth file cannot be hashed.
pub fn build_broadcast_manifest(
    dir: &Path,
    bundle_id: &str,
    mode_profile_id: &str,
    truth_bundle_hash: &str,
) -> Result<BroadcastManifest, ArtifactError> {
    let mut files = Vec::new();

    for name in ["tournament_manifest.json", "tournament.json"] {
        files.push(truth_entry(dir, name)?);
    }
    files.push(plain_entry("standings.json", FileClass::Telemetry));

    let mut match_dirs: Vec<_> = std::fs::read_dir(dir.join("matches"))?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    match_dirs.sort();

    for match_dir in match_dirs {
        let Some(name) = match_dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        for truth in ["match.jsonl", "match_manifest.json"] {
            files.push(truth_entry(dir, &format!("matches/{name}/{truth}"))?);
        }
        files.push(plain_entry(
            &format!("matches/{name}/match_summary.json"),
            FileClass::Telemetry,
        ));
        for (optional, class) in [
            ("verification_result.json", FileClass::Telemetry),
            ("moments.json", FileClass::Telemetry),
            ("highlights.json", FileClass::Show),
        ] {
            if match_dir.join(optional).is_file() {
                files.push(plain_entry(&format!("matches/{name}/{optional}"), class));
            }
        }
    }

    Ok(BroadcastManifest {
        bundle_id: bundle_id.to_string(),
        bundle_type: "tournament".to_string(),
        mode_profile_id: mode_profile_id.to_string(),
        created_by: format!("{RUNNER_NAME} {RUNNER_VERSION}"),
        files,
        truth_bundle_hash: truth_bundle_hash.to_string(),
    })
}

fn truth_entry(dir: &Path, relative: &str) -> Result<BroadcastFileEntry, ArtifactError> {
    let content_hash = hash_file(&dir.join(relative))?;
    Ok(BroadcastFileEntry {
        path: relative.to_string(),
        class: FileClass::Truth,
        content_hash: Some(content_hash),
        media_type: Some(media_type_of(relative).to_string()),
    })
}

fn plain_entry(relative: &str, class: FileClass) -> BroadcastFileEntry {
    BroadcastFileEntry {
        path: relative.to_string(),
        class,
        content_hash: None,
        media_type: Some(media_type_of(relative).to_string()),
    }
}

fn media_type_of(path: &str) -> &'static str {
    if path.ends_with(".jsonl") {
        "application/jsonl"
    } else {
        "application/json"
    }
}
