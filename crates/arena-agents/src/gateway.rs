// SPDX-License-Identifier: MIT OR Apache-2.0
//! The gateway seam for text-producing agents.
//!
//! A gateway turns an observation into raw model text; everything
//! downstream of it (decoding, forensics, adjudication) is the
//! runner's business. The HTTP implementation is deliberately thin:
//! one POST, one text body, no retries.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

/// One completion request.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// Acting agent.
    pub agent_id: String,
    /// 1-based turn number.
    pub turn: u32,
    /// The observation delivered to the agent (briefing included on
    /// turn 1).
    pub observation: Value,
}

/// Produces raw text for an observation.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Provider name recorded in manifests (e.g. `http`).
    fn provider(&self) -> &str;

    /// Model name recorded in manifests, if known.
    fn model(&self) -> Option<&str> {
        None
    }

    /// Produce the raw reply text.
    ///
    /// # Errors
    ///
    /// Errors surface as `AgentError` events; the match continues.
    async fn complete(&self, request: &GatewayRequest) -> anyhow::Result<String>;
}

/// Replays a fixed queue of responses. Used in tests and demos.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedGateway {
    /// Create a gateway that replays `responses` in order, then
    /// answers with empty text.
    #[must_use]
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl AgentGateway for ScriptedGateway {
    fn provider(&self) -> &str {
        "scripted-gateway"
    }

    async fn complete(&self, _request: &GatewayRequest) -> anyhow::Result<String> {
        let mut queue = self
            .responses
            .lock()
            .map_err(|_| anyhow::anyhow!("gateway response queue poisoned"))?;
        Ok(queue.pop_front().unwrap_or_default())
    }
}

/// POSTs the observation to an agent URL and returns the text body.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    url: String,
    model: Option<String>,
}

impl HttpGateway {
    /// Create a gateway for one agent endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            model: None,
        }
    }

    /// Record a model name for the manifest.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The endpoint this gateway talks to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AgentGateway for HttpGateway {
    fn provider(&self) -> &str {
        "http"
    }

    fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    async fn complete(&self, request: &GatewayRequest) -> anyhow::Result<String> {
        debug!(url = %self.url, agent = %request.agent_id, turn = request.turn, "gateway call");
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "agentId": request.agent_id,
                "turn": request.turn,
                "observation": request.observation,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}
