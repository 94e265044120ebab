// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical and atomic file primitives.

use std::io::Write as _;
use std::path::Path;

use serde_json::Value;

use arena_core::{CanonError, canonicalize};
use arena_runtime::ResolveError;

/// Errors from artifact writing.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Filesystem failure.
    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A value could not be canonicalized.
    #[error(transparent)]
    Canon(#[from] CanonError),
    /// A value could not be serialized.
    #[error("failed to serialize artifact: {0}")]
    Json(#[from] serde_json::Error),
    /// An agent key did not resolve while building manifests.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Atomic replace failed.
    #[error("atomic write failed: {0}")]
    Persist(String),
}

/// Write a value as canonical JSON with a single trailing newline.
///
/// # Errors
///
/// Returns [`ArtifactError`] on canonicalization or I/O failure.
pub fn write_canonical_file(path: &Path, value: &Value) -> Result<(), ArtifactError> {
    let mut text = canonicalize(value)?;
    text.push('\n');
    std::fs::write(path, text)?;
    Ok(())
}

/// Write bytes to a temp file in the target's directory, then rename.
///
/// Readers polling `path` see either the old contents or the new ones,
/// never a prefix.
///
/// # Errors
///
/// Returns [`ArtifactError`] on I/O or rename failure.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ArtifactError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|e| ArtifactError::Persist(e.to_string()))?;
    Ok(())
}
