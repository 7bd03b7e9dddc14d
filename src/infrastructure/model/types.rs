//! Model types - request, response, and error types

use crate::domain::types::{ChatMessage, MessageRole};
use thiserror::Error;

/// Chat request handed to an inference backend
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Response from an inference backend
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub message: ChatMessage,
    pub token_usage: Option<u32>,
}

impl ModelResponse {
    pub fn new(content: String, token_usage: Option<u32>) -> Self {
        Self {
            message: ChatMessage::new(MessageRole::Assistant, content),
            token_usage,
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("network error calling backend '{backend}': {source}")]
    Network {
        backend: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend '{backend}' returned an invalid response: {reason}")]
    InvalidResponse { backend: String, reason: String },
}

impl ModelError {
    pub fn network(backend: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            backend: backend.into(),
            source,
        }
    }

    pub fn invalid_response(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}
