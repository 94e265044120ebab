// SPDX-License-Identifier: MIT OR Apache-2.0
//! Check results and reports.

use serde::{Deserialize, Serialize};

/// Outcome of a single named check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Everything matched.
    Pass,
    /// Matched, with notes a reader should see.
    Warn,
    /// A recomputed value disagreed with a stored one.
    Fail,
    /// The check could not run (missing file, unreadable JSON).
    Error,
}

/// One named check with its findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// Check name (`structure`, `contentHashes`, ...).
    pub name: String,
    /// The worst finding.
    pub status: CheckStatus,
    /// Mismatches and failures.
    pub errors: Vec<String>,
    /// Notes that do not fail the check.
    pub warnings: Vec<String>,
}

/// Incremental builder so checks read as straight-line code.
#[derive(Debug)]
pub struct CheckBuilder {
    name: String,
    errors: Vec<String>,
    warnings: Vec<String>,
    structural: bool,
}

impl CheckBuilder {
    /// Start a check.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            errors: Vec::new(),
            warnings: Vec::new(),
            structural: false,
        }
    }

    /// Record a failure.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Record a failure that means the check could not run at all;
    /// the result becomes `error` instead of `fail`.
    pub fn structural(&mut self, message: impl Into<String>) {
        self.structural = true;
        self.errors.push(message.into());
    }

    /// Record a note.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Whether any failure has been recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Close the check.
    #[must_use]
    pub fn finish(self) -> CheckResult {
        let status = if self.errors.is_empty() {
            if self.warnings.is_empty() {
                CheckStatus::Pass
            } else {
                CheckStatus::Warn
            }
        } else if self.structural {
            CheckStatus::Error
        } else {
            CheckStatus::Fail
        };
        CheckResult {
            name: self.name,
            status,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

/// A full verification run over one target directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    /// What was verified (directory path as given).
    pub target: String,
    /// Every check that ran.
    pub checks: Vec<CheckResult>,
    /// Worst status across all checks.
    pub status: CheckStatus,
}

impl VerificationReport {
    /// Assemble a report from finished checks.
    #[must_use]
    pub fn new(target: impl Into<String>, checks: Vec<CheckResult>) -> Self {
        let status = checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(CheckStatus::Pass);
        Self {
            target: target.into(),
            checks,
            status,
        }
    }

    /// Whether nothing failed (warnings allowed).
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status <= CheckStatus::Warn
    }

    /// The process exit code: 0 pass/warn, 1 mismatch, 2 structural.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.status {
            CheckStatus::Pass | CheckStatus::Warn => 0,
            CheckStatus::Fail => 1,
            CheckStatus::Error => 2,
        }
    }
}
