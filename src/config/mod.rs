pub mod params;

use params::ParameterStoreClient;
use std::env;
use std::sync::Once;
use thiserror::Error;
use tracing::{info, warn};

/// Environment variables read once at startup.
pub const REGION_ENV: &str = "AWS_REGION";
pub const TOOL_ENDPOINT_ENV: &str = "MCP_SERVER_URL";
pub const MODEL_API_KEY_ENV: &str = "MODEL_API_KEY";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const MODEL_PREFERENCE_ENV: &str = "MODEL_PREFERENCE";
pub const PARAMETER_STORE_URL_ENV: &str = "PARAMETER_STORE_URL";
pub const PORT_ENV: &str = "PORT";

/// Fixed parameter names used by managed deployments.
pub const TOOL_ENDPOINT_PARAMETER: &str = "/x402/gateway/mcp-server-url";
pub const MODEL_API_KEY_PARAMETER: &str = "/x402/gateway/model-api-key";

const DEFAULT_PORT: u16 = 8080;

static ENV_LOADER: Once = Once::new();

/// Ensures environment variables are loaded from a local .env file.
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = dotenvy::dotenv();
    });
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required setting '{setting}' is not set")]
    MissingCredential { setting: &'static str },
}

/// Logical model preference resolved by the model selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelPreference {
    #[default]
    Primary,
    Secondary,
}

impl ModelPreference {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelPreference::Primary => "primary",
            ModelPreference::Secondary => "secondary",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "primary" => Some(ModelPreference::Primary),
            "secondary" => Some(ModelPreference::Secondary),
            _ => None,
        }
    }
}

/// Runtime settings resolved once at process start. Unset values are valid;
/// every consumer carries its own fallback.
#[derive(Debug, Clone, Default)]
pub struct RuntimeSettings {
    pub region: Option<String>,
    pub tool_endpoint: Option<String>,
    pub model_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub preference: ModelPreference,
    pub parameter_store_url: Option<String>,
    pub port: u16,
}

impl RuntimeSettings {
    pub fn from_env() -> Self {
        ensure_env_loaded();

        let preference = match env_non_empty(MODEL_PREFERENCE_ENV) {
            Some(raw) => ModelPreference::parse(&raw).unwrap_or_else(|| {
                warn!(
                    value = raw.as_str(),
                    "Unknown model preference; falling back to primary"
                );
                ModelPreference::default()
            }),
            None => ModelPreference::default(),
        };

        let port = env_non_empty(PORT_ENV)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            region: env_non_empty(REGION_ENV),
            tool_endpoint: env_non_empty(TOOL_ENDPOINT_ENV),
            model_api_key: env_non_empty(MODEL_API_KEY_ENV),
            gemini_api_key: env_non_empty(GEMINI_API_KEY_ENV),
            preference,
            parameter_store_url: env_non_empty(PARAMETER_STORE_URL_ENV),
            port,
        }
    }

    /// A region indicator in the environment marks a managed deployment.
    pub fn is_managed(&self) -> bool {
        self.region.is_some()
    }

    /// Fill settings that were not supplied locally from the remote parameter
    /// store. One attempt per setting; failures leave the setting unset.
    pub async fn resolve_remote(&mut self, store: &ParameterStoreClient) {
        if self.tool_endpoint.is_none() {
            match store.get_parameter(TOOL_ENDPOINT_PARAMETER, false).await {
                Ok(value) => {
                    info!(parameter = TOOL_ENDPOINT_PARAMETER, "Resolved tool endpoint from parameter store");
                    self.tool_endpoint = Some(value);
                }
                Err(error) => {
                    warn!(parameter = TOOL_ENDPOINT_PARAMETER, %error, "Failed to resolve tool endpoint; leaving unset");
                }
            }
        }

        if self.model_api_key.is_none() {
            match store.get_parameter(MODEL_API_KEY_PARAMETER, true).await {
                Ok(value) => {
                    info!(parameter = MODEL_API_KEY_PARAMETER, "Resolved model credential from parameter store");
                    self.model_api_key = Some(value);
                }
                Err(error) => {
                    warn!(parameter = MODEL_API_KEY_PARAMETER, %error, "Failed to resolve model credential; leaving unset");
                }
            }
        }
    }

    pub fn log_summary(&self) {
        info!(
            port = self.port,
            preference = self.preference.as_str(),
            region = self.region.as_deref().unwrap_or("not set"),
            tool_endpoint = self.tool_endpoint.as_deref().unwrap_or("not set"),
            model_api_key = if self.model_api_key.is_some() { "set" } else { "not set" },
            gemini_api_key = if self.gemini_api_key.is_some() { "set" } else { "not set" },
            "Runtime settings resolved"
        );
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
