//! Model selector - resolves a logical preference to a concrete backend

use super::clients::{ClaudeClient, GeminiClient};
use super::traits::ModelBackend;
use crate::config::{
    ConfigError, GEMINI_API_KEY_ENV, MODEL_API_KEY_ENV, ModelPreference, RuntimeSettings,
};
use tracing::debug;

/// Pure resolution step from preference to backend handle. Constructing a
/// handle performs no network I/O; the only failure mode is a missing
/// mandatory credential for the chosen backend.
pub struct ModelSelector;

impl ModelSelector {
    pub fn resolve(
        preference: ModelPreference,
        settings: &RuntimeSettings,
    ) -> Result<Box<dyn ModelBackend>, ConfigError> {
        debug!(preference = preference.as_str(), "Resolving model backend");
        match preference {
            ModelPreference::Primary => {
                let api_key =
                    settings
                        .model_api_key
                        .clone()
                        .ok_or(ConfigError::MissingCredential {
                            setting: MODEL_API_KEY_ENV,
                        })?;
                Ok(Box::new(ClaudeClient::new(api_key)))
            }
            ModelPreference::Secondary => {
                let api_key =
                    settings
                        .gemini_api_key
                        .clone()
                        .ok_or(ConfigError::MissingCredential {
                            setting: GEMINI_API_KEY_ENV,
                        })?;
                Ok(Box::new(GeminiClient::new(api_key)))
            }
        }
    }
}
