// SPDX-License-Identifier: MIT OR Apache-2.0
//! Storage-root resolution.
//!
//! The one place the core reads the process environment. Everything
//! else takes paths as arguments, which keeps the rest of the workspace
//! pure and testable.

use std::path::PathBuf;

/// Environment variable naming the storage root for match directories.
pub const DATA_DIR_ENV: &str = "ARENA_DATA_DIR";

/// Default storage root, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "arena-data";

/// Resolve the process-wide storage root.
///
/// `ARENA_DATA_DIR` wins when set and non-empty; otherwise
/// `./arena-data`.
#[must_use]
pub fn storage_root() -> PathBuf {
    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(DEFAULT_DATA_DIR),
    }
}
