// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compiled action schemas.
//!
//! Scenarios hand the decoder a JSON Schema document; compiling it once
//! per match keeps per-turn validation cheap.

use serde_json::Value;

/// Errors from schema compilation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema document itself is invalid.
    #[error("invalid action schema: {0}")]
    Invalid(String),
}

/// A compiled JSON Schema for a scenario's action shape.
pub struct CompiledSchema {
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema").finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// Compile a JSON Schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] if the document is not a valid
    /// schema.
    pub fn compile(schema: &Value) -> Result<Self, SchemaError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| SchemaError::Invalid(e.to_string()))?;
        Ok(Self { validator })
    }

    /// Whether `instance` validates.
    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Collect human-readable validation errors for `instance`.
    #[must_use]
    pub fn errors(&self, instance: &Value) -> Vec<String> {
        self.validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect()
    }
}
