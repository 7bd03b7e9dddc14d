//! Gemini client implementation

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::domain::types::MessageRole;
use crate::infrastructure::model::traits::ModelBackend;
use crate::infrastructure::model::types::{ModelError, ModelRequest, ModelResponse};

const BACKEND_ID: &str = "gemini";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const API_PATH: &str = "v1beta/models";

/// Gemini backend. The secondary inference target of the gateway.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    fn build_model_url(&self, model: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        format!("{base}/{API_PATH}/{model}:generateContent")
    }

    fn build_payload(request: &ModelRequest) -> Value {
        let mut contents = Vec::new();
        let mut system_parts = Vec::new();
        for message in &request.messages {
            match message.role {
                MessageRole::System => {
                    system_parts.push(json!({ "text": message.content }));
                }
                MessageRole::User => {
                    contents.push(json!({ "role": "user", "parts": [{"text": message.content}] }));
                }
                MessageRole::Assistant => {
                    contents.push(json!({ "role": "model", "parts": [{"text": message.content}] }));
                }
            }
        }

        let mut payload = json!({ "contents": contents });
        if !system_parts.is_empty() {
            payload["system_instruction"] = json!({ "parts": system_parts });
        }
        payload
    }
}

#[async_trait]
impl ModelBackend for GeminiClient {
    fn id(&self) -> &str {
        BACKEND_ID
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = self.build_model_url(&request.model);
        let payload = Self::build_payload(&request);

        info!(
            backend = BACKEND_ID,
            model = request.model.as_str(),
            messages = request.messages.len(),
            "Sending request to Gemini backend"
        );

        let response: GeminiResponse = self
            .http
            .post(format!("{url}?key={}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ModelError::network(BACKEND_ID, e))?
            .error_for_status()
            .map_err(|e| ModelError::network(BACKEND_ID, e))?
            .json()
            .await
            .map_err(|e| ModelError::network(BACKEND_ID, e))?;
        debug!("Received response from Gemini backend");

        let token_usage = response
            .usage_metadata
            .and_then(|usage| usage.total_token_count);

        let content = response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .flat_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| ModelError::invalid_response(BACKEND_ID, "missing text"))?;

        Ok(ModelResponse::new(content, token_usage))
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiUsage {
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u32>,
}
