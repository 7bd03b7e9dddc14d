use super::error::ToolInvokeError;
use async_trait::async_trait;
use serde_json::Value;

/// A named, remotely discovered operation the model may request during
/// generation. Discovered once per agent construction and immutable for the
/// agent's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCapability {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

/// Seam between the agent loop and the remote tool provider.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolInvokeError>;
}
