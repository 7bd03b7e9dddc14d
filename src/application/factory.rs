//! Agent construction at startup. Discovery failures degrade the agent
//! instead of failing the build; only a missing model credential is fatal.

use crate::application::agent::Agent;
use crate::application::tooling::{DEFAULT_DISCOVERY_TIMEOUT_MS, ToolClient};
use crate::config::{ConfigError, ModelPreference, RuntimeSettings};
use crate::infrastructure::model::ModelSelector;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn build_agent(settings: &RuntimeSettings) -> Result<Agent, ConfigError> {
    let Some(endpoint) = settings.tool_endpoint.as_deref() else {
        warn!("No tool endpoint configured; starting degraded agent");
        return degraded_agent(settings);
    };

    let client = ToolClient::new(endpoint);
    match client.discover_tools(DEFAULT_DISCOVERY_TIMEOUT_MS).await {
        Ok(tools) => {
            let backend = ModelSelector::resolve(settings.preference, settings)?;
            info!(
                backend = backend.id(),
                tool_count = tools.len(),
                "Agent ready with discovered tools"
            );
            Ok(Agent::with_tools(backend, tools, Arc::new(client)))
        }
        Err(error) => {
            warn!(%error, "Tool discovery failed; starting degraded agent");
            degraded_agent(settings)
        }
    }
}

/// The fallback agent is always bound to the primary backend, regardless of
/// the configured preference.
fn degraded_agent(settings: &RuntimeSettings) -> Result<Agent, ConfigError> {
    let backend = ModelSelector::resolve(ModelPreference::Primary, settings)?;
    Ok(Agent::degraded(backend))
}
