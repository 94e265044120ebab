// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scenario and agent registries.
//!
//! CLI entry points resolve short stable keys (`numberGuess`, `random`)
//! into factories here. A `BTreeMap` keeps listings sorted without a
//! separate sort pass.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::agent::{Agent, AgentKind};
use crate::scenario::Scenario;

/// Unknown scenario or agent key.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No scenario registered under the key.
    #[error("unknown scenario: {key}")]
    UnknownScenario {
        /// The key that was looked up.
        key: String,
    },
    /// No agent registered under the key.
    #[error("unknown agent: {key}")]
    UnknownAgent {
        /// The key that was looked up.
        key: String,
    },
}

/// Named scenario rulebooks.
#[derive(Default)]
pub struct ScenarioRegistry {
    scenarios: BTreeMap<String, Arc<dyn Scenario>>,
}

impl ScenarioRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scenario under its key, replacing any previous entry.
    pub fn register(&mut self, scenario: impl Scenario + 'static) {
        self.scenarios
            .insert(scenario.key().to_string(), Arc::new(scenario));
    }

    /// Resolve a scenario by key.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownScenario`] for unregistered keys.
    pub fn get(&self, key: &str) -> Result<Arc<dyn Scenario>, ResolveError> {
        self.scenarios
            .get(key)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownScenario {
                key: key.to_string(),
            })
    }

    /// Sorted list of registered keys.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.scenarios.keys().map(String::as_str).collect()
    }
}

/// Builds fresh agent instances for a match.
pub struct AgentFactory {
    /// Scripted or gateway-backed; recorded in manifests.
    pub kind: AgentKind,
    /// Implementation version; recorded in manifests.
    pub version: String,
    make: Box<dyn Fn(String) -> Box<dyn Agent> + Send + Sync>,
}

impl AgentFactory {
    /// Create a factory from a constructor closure.
    pub fn new(
        kind: AgentKind,
        version: impl Into<String>,
        make: impl Fn(String) -> Box<dyn Agent> + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            version: version.into(),
            make: Box::new(make),
        }
    }

    /// Build a fresh agent with the given match-local id.
    #[must_use]
    pub fn make(&self, agent_id: String) -> Box<dyn Agent> {
        (self.make)(agent_id)
    }
}

impl std::fmt::Debug for AgentFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentFactory")
            .field("kind", &self.kind)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Named agent factories.
#[derive(Default)]
pub struct AgentRegistry {
    factories: BTreeMap<String, AgentFactory>,
}

impl AgentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a key, replacing any previous entry.
    pub fn register(&mut self, key: impl Into<String>, factory: AgentFactory) {
        self.factories.insert(key.into(), factory);
    }

    /// Resolve a factory by key.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownAgent`] for unregistered keys.
    pub fn get(&self, key: &str) -> Result<&AgentFactory, ResolveError> {
        self.factories.get(key).ok_or_else(|| ResolveError::UnknownAgent {
            key: key.to_string(),
        })
    }

    /// Sorted list of registered keys.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
