// SPDX-License-Identifier: MIT OR Apache-2.0
//! SHA-256 hashing over files, manifest cores, and truth bundles.
//!
//! All hashes that travel inside artifacts carry the `sha256:` prefix;
//! [`sha256_hex`] alone is the bare digest. The manifest-core exclusion
//! set is pinned here, in one projection function shared by the writer
//! and every verifier.

use std::io;
use std::path::Path;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::canon::{CanonError, canonicalize};

/// Prefix carried by every content hash stored in an artifact.
pub const HASH_PREFIX: &str = "sha256:";

/// Top-level keys removed by [`manifest_core`] before hashing.
///
/// `createdAt` is a mutable timestamp; the rest are fields that are
/// themselves derived hashes or attached receipts, which would make the
/// stored hash self-referential.
pub const MANIFEST_EXCLUDED_KEYS: [&str; 4] = ["createdAt", "receipt", "hashes", "truthBundleHash"];

/// Hex-encoded SHA-256 of raw bytes, without prefix.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of a file's bytes, with the `sha256:` prefix.
///
/// # Errors
///
/// Propagates the underlying I/O error if the file cannot be read.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{HASH_PREFIX}{}", sha256_hex(&bytes)))
}

/// Project a manifest down to its hashable core.
///
/// Removes the keys in [`MANIFEST_EXCLUDED_KEYS`] from the top level
/// only; nested occurrences are part of the core.
#[must_use]
pub fn manifest_core(manifest: &Value) -> Value {
    match manifest {
        Value::Object(map) => {
            let mut core = map.clone();
            for key in MANIFEST_EXCLUDED_KEYS {
                core.remove(key);
            }
            Value::Object(core)
        }
        other => other.clone(),
    }
}

/// Hash the canonical bytes of a manifest core, with the `sha256:` prefix.
///
/// # Errors
///
/// Returns [`CanonError`] if the core cannot be canonicalized.
pub fn hash_manifest_core(manifest: &Value) -> Result<String, CanonError> {
    let core = manifest_core(manifest);
    let canonical = canonicalize(&core)?;
    Ok(format!("{HASH_PREFIX}{}", sha256_hex(canonical.as_bytes())))
}

/// Single fingerprint for an entire tournament's truth.
///
/// Sorts the full prefixed log-hash strings lexicographically,
/// concatenates them as UTF-8, and returns the bare hex digest.
#[must_use]
pub fn truth_bundle_hash(log_hashes: &[String]) -> String {
    let mut sorted: Vec<&str> = log_hashes.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sha256_hex(sorted.concat().as_bytes())
}
