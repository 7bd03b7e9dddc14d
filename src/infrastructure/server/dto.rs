//! Wire DTOs for the gateway's REST surface.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub time_of_last_update: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InvocationRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvocationMetadata {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvocationResponse {
    pub response: String,
    pub status: String,
    pub metadata: InvocationMetadata,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
    pub endpoints: ServiceEndpoints,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceEndpoints {
    pub ping: String,
    pub invocations: String,
    pub docs: String,
}
