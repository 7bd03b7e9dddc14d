//! Shared gateway state. Created once in `main`, handed to the router and the
//! one-shot startup task as an `Arc`.

use crate::application::Agent;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Clone)]
pub enum GatewayStatus {
    Initializing,
    Ready(Arc<Agent>),
    Failed(String),
}

impl GatewayStatus {
    pub fn label(&self) -> &'static str {
        match self {
            GatewayStatus::Initializing => "initializing",
            GatewayStatus::Ready(_) => "ready",
            GatewayStatus::Failed(_) => "failed",
        }
    }
}

struct StatusCell {
    status: GatewayStatus,
    transitioned_at: i64,
}

/// Status plus the epoch second of the last transition. Transitions happen at
/// most once per process: out of `Initializing`, never back.
pub struct GatewayContext {
    cell: RwLock<StatusCell>,
}

impl GatewayContext {
    pub fn new() -> Self {
        Self {
            cell: RwLock::new(StatusCell {
                status: GatewayStatus::Initializing,
                transitioned_at: Utc::now().timestamp(),
            }),
        }
    }

    pub async fn snapshot(&self) -> (GatewayStatus, i64) {
        let cell = self.cell.read().await;
        (cell.status.clone(), cell.transitioned_at)
    }

    pub async fn agent(&self) -> Option<Arc<Agent>> {
        match &self.cell.read().await.status {
            GatewayStatus::Ready(agent) => Some(Arc::clone(agent)),
            _ => None,
        }
    }

    pub async fn set_ready(&self, agent: Arc<Agent>) {
        let mut cell = self.cell.write().await;
        if !matches!(cell.status, GatewayStatus::Initializing) {
            warn!(status = cell.status.label(), "Ignoring ready transition");
            return;
        }
        info!(degraded = agent.is_degraded(), "Gateway is ready");
        cell.status = GatewayStatus::Ready(agent);
        cell.transitioned_at = Utc::now().timestamp();
    }

    pub async fn set_failed(&self, reason: String) {
        let mut cell = self.cell.write().await;
        if !matches!(cell.status, GatewayStatus::Initializing) {
            warn!(status = cell.status.label(), "Ignoring failed transition");
            return;
        }
        error!(reason = reason.as_str(), "Gateway initialization failed");
        cell.status = GatewayStatus::Failed(reason);
        cell.transitioned_at = Utc::now().timestamp();
    }
}

impl Default for GatewayContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::model::{ModelBackend, ModelError, ModelRequest, ModelResponse};
    use async_trait::async_trait;

    struct StaticBackend;

    #[async_trait]
    impl ModelBackend for StaticBackend {
        fn id(&self) -> &str {
            "static"
        }

        fn default_model(&self) -> &str {
            "static-model"
        }

        async fn chat(&self, _request: ModelRequest) -> Result<ModelResponse, ModelError> {
            Ok(ModelResponse::new("ok".to_string(), None))
        }
    }

    fn test_agent() -> Arc<Agent> {
        Arc::new(Agent::degraded(Box::new(StaticBackend)))
    }

    #[tokio::test]
    async fn starts_initializing() {
        let ctx = GatewayContext::new();
        let (status, _) = ctx.snapshot().await;
        assert!(matches!(status, GatewayStatus::Initializing));
        assert!(ctx.agent().await.is_none());
    }

    #[tokio::test]
    async fn ready_transition_exposes_the_agent() {
        let ctx = GatewayContext::new();
        ctx.set_ready(test_agent()).await;

        let (status, _) = ctx.snapshot().await;
        assert!(matches!(status, GatewayStatus::Ready(_)));
        assert!(ctx.agent().await.is_some());
    }

    #[tokio::test]
    async fn ready_state_never_reverts() {
        let ctx = GatewayContext::new();
        ctx.set_ready(test_agent()).await;
        ctx.set_failed("late failure".to_string()).await;

        let (status, _) = ctx.snapshot().await;
        assert!(matches!(status, GatewayStatus::Ready(_)));

        // A completion is still obtainable through the retained agent.
        let agent = ctx.agent().await.expect("agent retained");
        let completion = agent.generate("hello").await.expect("generation works");
        assert_eq!(completion.text, "ok");
        assert_eq!(completion.used_tool_count, 0);
    }

    #[tokio::test]
    async fn failed_state_keeps_the_reason() {
        let ctx = GatewayContext::new();
        ctx.set_failed("credential missing".to_string()).await;
        ctx.set_ready(test_agent()).await;

        let (status, _) = ctx.snapshot().await;
        match status {
            GatewayStatus::Failed(reason) => assert_eq!(reason, "credential missing"),
            _ => panic!("failed state must persist"),
        }
    }
}
