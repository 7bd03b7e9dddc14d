//! Inbound body handling for `/invocations`. The orchestrator sends the same
//! logical prompt in three physical shapes depending on its invoker; each
//! shape gets its own classification arm and normalization path.

use axum::body::Bytes;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("invalid request payload: {details}")]
    InvalidPrompt { details: String },
}

impl PayloadError {
    fn prompt(details: impl Into<String>) -> Self {
        Self::InvalidPrompt {
            details: details.into(),
        }
    }

    pub fn details(&self) -> &str {
        match self {
            Self::InvalidPrompt { details } => details,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundPayload {
    Structured(Value),
    RawBytes(Bytes),
    PlainText(String),
}

impl InboundPayload {
    /// Classify a body by its Content-Type header. A JSON content type whose
    /// body does not parse falls back to the raw-bytes arm rather than being
    /// rejected outright.
    pub fn classify(content_type: Option<&str>, body: Bytes) -> Self {
        let content_type = content_type.unwrap_or("").to_ascii_lowercase();
        if content_type.contains("application/json") {
            if let Ok(value) = serde_json::from_slice::<Value>(&body) {
                return InboundPayload::Structured(value);
            }
            return InboundPayload::RawBytes(body);
        }
        if content_type.starts_with("text/") {
            return InboundPayload::PlainText(String::from_utf8_lossy(&body).into_owned());
        }
        InboundPayload::RawBytes(body)
    }

    /// Reduce the payload to the prompt string the agent will see.
    pub fn normalize(self) -> Result<String, PayloadError> {
        match self {
            InboundPayload::Structured(value) => prompt_field(&value),
            InboundPayload::RawBytes(bytes) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                match serde_json::from_str::<Value>(&text) {
                    Ok(value) => prompt_field(&value),
                    Err(_) => verbatim(text),
                }
            }
            InboundPayload::PlainText(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => prompt_field(&value),
                Err(_) => verbatim(text),
            },
        }
    }
}

fn prompt_field(value: &Value) -> Result<String, PayloadError> {
    let Some(prompt) = value.get("prompt") else {
        return Err(PayloadError::prompt("the 'prompt' field is required"));
    };
    let Some(prompt) = prompt.as_str() else {
        return Err(PayloadError::prompt("the 'prompt' field must be a string"));
    };
    if prompt.trim().is_empty() {
        return Err(PayloadError::prompt("the 'prompt' field must not be empty"));
    }
    Ok(prompt.to_string())
}

fn verbatim(text: String) -> Result<String, PayloadError> {
    if text.trim().is_empty() {
        return Err(PayloadError::prompt(
            "the request body did not contain a usable 'prompt'",
        ));
    }
    Ok(text)
}
