// SPDX-License-Identifier: MIT OR Apache-2.0
//! The gateway-backed text agent.
//!
//! Returns raw gateway text as-is; the runner owns decoding it. This
//! keeps the fallible surface (model output) clearly separated from
//! the deterministic surface (everything else).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use arena_runtime::{Agent, AgentContext, AgentKind, AgentReply};

use crate::gateway::{AgentGateway, GatewayRequest};

/// A fallible agent whose replies are free-form text.
pub struct TextAgent {
    id: String,
    gateway: Arc<dyn AgentGateway>,
}

impl TextAgent {
    /// Create a text agent backed by the given gateway.
    #[must_use]
    pub fn new(id: impl Into<String>, gateway: Arc<dyn AgentGateway>) -> Self {
        Self {
            id: id.into(),
            gateway,
        }
    }

    /// Provider name of the underlying gateway.
    #[must_use]
    pub fn provider(&self) -> &str {
        self.gateway.provider()
    }

    /// Model name of the underlying gateway, if known.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.gateway.model()
    }
}

impl std::fmt::Debug for TextAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextAgent")
            .field("id", &self.id)
            .field("provider", &self.gateway.provider())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for TextAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Llm
    }

    async fn act(
        &mut self,
        observation: &Value,
        ctx: &mut AgentContext<'_>,
    ) -> anyhow::Result<AgentReply> {
        let request = GatewayRequest {
            agent_id: ctx.agent_id.to_string(),
            turn: ctx.turn,
            observation: observation.clone(),
        };
        let raw = self.gateway.complete(&request).await?;
        Ok(AgentReply::Text(raw))
    }
}
