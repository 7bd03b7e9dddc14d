//! Model backend trait

use super::types::{ModelError, ModelRequest, ModelResponse};
use async_trait::async_trait;

/// Trait for inference backend implementations
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Stable identifier used in logs and response metadata
    fn id(&self) -> &str;

    /// Default model name for this backend
    fn default_model(&self) -> &str;

    /// Send a chat request to the backend
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}

impl std::fmt::Debug for dyn ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBackend")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}
