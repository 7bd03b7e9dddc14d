//! Remote parameter store client.
//!
//! Managed deployments keep late-bound settings (tool endpoint URL, model
//! credential) in a parameter store fronted by the runtime. Each parameter is
//! fetched by its fixed name exactly once per process lifetime; callers decide
//! what to do when a lookup fails.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ParameterStoreError {
    #[error("parameter '{name}' was not found")]
    NotFound { name: String },
    #[error("access to parameter '{name}' was denied")]
    Denied { name: String },
    #[error("network error fetching parameter '{name}': {source}")]
    Network {
        name: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("parameter store returned an invalid response for '{name}': {reason}")]
    InvalidResponse { name: String, reason: String },
}

#[derive(Clone)]
pub struct ParameterStoreClient {
    http: Client,
    base_url: String,
}

impl ParameterStoreClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            http: client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        let trimmed = self.base_url.trim_end_matches('/');
        format!("{trimmed}/parameters")
    }

    /// Fetch a single parameter by name. `with_decryption` must be set for
    /// secret-typed values. One attempt, no retries.
    pub async fn get_parameter(
        &self,
        name: &str,
        with_decryption: bool,
    ) -> Result<String, ParameterStoreError> {
        let url = self.endpoint();
        debug!(name, with_decryption, "Fetching parameter from remote store");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("name", name),
                ("withDecryption", if with_decryption { "true" } else { "false" }),
            ])
            .send()
            .await
            .map_err(|source| ParameterStoreError::Network {
                name: name.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(ParameterStoreError::NotFound {
                    name: name.to_string(),
                });
            }
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                return Err(ParameterStoreError::Denied {
                    name: name.to_string(),
                });
            }
            _ => {}
        }

        let body: ParameterEnvelope = response
            .error_for_status()
            .map_err(|source| ParameterStoreError::Network {
                name: name.to_string(),
                source,
            })?
            .json()
            .await
            .map_err(|source| ParameterStoreError::Network {
                name: name.to_string(),
                source,
            })?;

        let value = body
            .parameter
            .and_then(|parameter| parameter.value)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ParameterStoreError::InvalidResponse {
                name: name.to_string(),
                reason: "missing parameter value".to_string(),
            })?;

        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
struct ParameterEnvelope {
    parameter: Option<ParameterBody>,
}

#[derive(Debug, Deserialize)]
struct ParameterBody {
    value: Option<String>,
}
