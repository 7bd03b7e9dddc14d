//! Claude client implementation (Anthropic-compatible Messages API)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::types::MessageRole;
use crate::infrastructure::model::traits::ModelBackend;
use crate::infrastructure::model::types::{ModelError, ModelRequest, ModelResponse};

const BACKEND_ID: &str = "claude";
const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-v2";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Claude-family backend. The primary inference target of the gateway.
#[derive(Clone)]
pub struct ClaudeClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ClaudeClient {
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

    fn messages_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        format!("{base}/v1/messages")
    }
}

#[async_trait]
impl ModelBackend for ClaudeClient {
    fn id(&self) -> &str {
        BACKEND_ID
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = self.messages_url();
        let payload = ClaudeRequest::from(&request);

        info!(
            backend = BACKEND_ID,
            model = request.model.as_str(),
            messages = request.messages.len(),
            "Sending request to Claude backend"
        );

        let response: ClaudeResponse = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ModelError::network(BACKEND_ID, e))?
            .error_for_status()
            .map_err(|e| ModelError::network(BACKEND_ID, e))?
            .json()
            .await
            .map_err(|e| ModelError::network(BACKEND_ID, e))?;
        debug!("Received response from Claude backend");

        let text = response
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| ModelError::invalid_response(BACKEND_ID, "missing text block"))?;

        let token_usage = response
            .usage
            .map(|usage| usage.input_tokens + usage.output_tokens);

        Ok(ModelResponse::new(text, token_usage))
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: &'static str,
    content: String,
}

impl From<&ModelRequest> for ClaudeRequest {
    fn from(value: &ModelRequest) -> Self {
        // System messages travel in a dedicated field, not the message list.
        let system_text: Vec<&str> = value
            .messages
            .iter()
            .filter(|msg| msg.role == MessageRole::System)
            .map(|msg| msg.content.as_str())
            .collect();
        let system = if system_text.is_empty() {
            None
        } else {
            Some(system_text.join("\n\n"))
        };

        let messages = value
            .messages
            .iter()
            .filter(|msg| msg.role != MessageRole::System)
            .map(|msg| ClaudeMessage {
                role: match msg.role {
                    MessageRole::Assistant => "assistant",
                    _ => "user",
                },
                content: msg.content.clone(),
            })
            .collect();

        Self {
            model: value.model.clone(),
            max_tokens: MAX_TOKENS,
            system,
            messages,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContentBlock>,
    usage: Option<ClaudeUsage>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ChatMessage;

    #[test]
    fn request_conversion_extracts_system_field() {
        let request = ModelRequest {
            model: DEFAULT_MODEL.into(),
            messages: vec![
                ChatMessage::new(MessageRole::System, "stay concise"),
                ChatMessage::new(MessageRole::User, "hi"),
                ChatMessage::new(MessageRole::Assistant, "hello"),
            ],
        };
        let payload = ClaudeRequest::from(&request);
        assert_eq!(payload.system.as_deref(), Some("stay concise"));
        let roles: Vec<_> = payload.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["user", "assistant"]);
    }

    #[test]
    fn response_parse_sums_token_usage() {
        let raw = r#"{
            "content": [{"type": "text", "text": "sunny and warm"}],
            "usage": {"input_tokens": 12, "output_tokens": 30}
        }"#;
        let parsed: ClaudeResponse = serde_json::from_str(raw).expect("parse response");
        let usage = parsed.usage.expect("usage present");
        assert_eq!(usage.input_tokens + usage.output_tokens, 42);
        assert_eq!(parsed.content[0].text.as_deref(), Some("sunny and warm"));
    }

    #[test]
    fn messages_url_joins_endpoint() {
        let client = ClaudeClient::with_endpoint("key", "https://llm.internal/");
        assert_eq!(client.messages_url(), "https://llm.internal/v1/messages");
    }
}
