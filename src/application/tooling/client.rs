//! HTTP transport for the remote tool provider (JSON-RPC over POST).

use super::error::{ToolDiscoveryError, ToolInvokeError};
use super::interface::{ToolCapability, ToolInvoker};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info};

const PROTOCOL_VERSION: &str = "2025-06-18";
const RPC_PATH: &str = "/mcp";

/// Default bound on the whole discovery sequence.
pub const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Error)]
enum RpcError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid response: {0}")]
    Invalid(String),
}

/// Client for a single remote tool provider. Connectionless: every JSON-RPC
/// exchange is one POST against the provider's `/mcp` route.
pub struct ToolClient {
    http: Client,
    endpoint: String,
    id_counter: AtomicU64,
}

impl ToolClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            id_counter: AtomicU64::new(1),
        }
    }

    fn rpc_url(&self) -> String {
        let trimmed = self.endpoint.trim_end_matches('/');
        format!("{trimmed}{RPC_PATH}")
    }

    fn next_id(&self) -> u64 {
        self.id_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// List the provider's capabilities, bounded by `timeout_ms`. A provider
    /// with nothing to offer yields an empty map, which is a valid result.
    /// Retry policy belongs to the caller.
    pub async fn discover_tools(
        &self,
        timeout_ms: u64,
    ) -> Result<HashMap<String, ToolCapability>, ToolDiscoveryError> {
        info!(endpoint = self.endpoint.as_str(), timeout_ms, "Discovering tools");
        let sequence = self.discovery_sequence();
        match timeout(Duration::from_millis(timeout_ms), sequence).await {
            Ok(Ok(tools)) => {
                info!(tool_count = tools.len(), "Tool discovery completed");
                Ok(tools)
            }
            Ok(Err(error)) => Err(self.discovery_error(error)),
            Err(_) => Err(ToolDiscoveryError::Timeout {
                endpoint: self.endpoint.clone(),
                timeout_ms,
            }),
        }
    }

    async fn discovery_sequence(&self) -> Result<HashMap<String, ToolCapability>, RpcError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        self.send_request("initialize", params).await?;
        self.send_notification("notifications/initialized", json!({}))
            .await?;

        let result = self.send_request("tools/list", json!({})).await?;
        Ok(Self::parse_tool_list(result))
    }

    fn parse_tool_list(result: Value) -> HashMap<String, ToolCapability> {
        let mut tools = HashMap::new();
        if let Some(array) = result.get("tools").and_then(Value::as_array) {
            for tool in array {
                if let Some(name) = tool.get("name").and_then(Value::as_str) {
                    let description = tool
                        .get("description")
                        .and_then(Value::as_str)
                        .map(|text| text.to_string());
                    let input_schema = tool.get("inputSchema").cloned();
                    tools.insert(
                        name.to_string(),
                        ToolCapability {
                            name: name.to_string(),
                            description,
                            input_schema,
                        },
                    );
                }
            }
        }
        tools
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": method,
            "params": params
        });
        debug!(method, "Sending JSON-RPC request to tool endpoint");

        let body: Value = self
            .http
            .post(self.rpc_url())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = body.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(-32000);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(RpcError::Rpc { code, message });
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| RpcError::Invalid("missing result field".to_string()))
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        self.http
            .post(self.rpc_url())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn discovery_error(&self, error: RpcError) -> ToolDiscoveryError {
        match error {
            RpcError::Transport(source) => ToolDiscoveryError::Unreachable {
                endpoint: self.endpoint.clone(),
                source,
            },
            RpcError::Rpc { code, message } => ToolDiscoveryError::Rpc {
                endpoint: self.endpoint.clone(),
                code,
                message,
            },
            RpcError::Invalid(reason) => ToolDiscoveryError::InvalidResponse {
                endpoint: self.endpoint.clone(),
                reason,
            },
        }
    }
}

#[async_trait]
impl ToolInvoker for ToolClient {
    async fn invoke_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolInvokeError> {
        let params = json!({
            "name": tool,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            }
        });
        info!(tool, "Invoking remote tool");
        match self.send_request("tools/call", params).await {
            Ok(result) => Ok(result),
            Err(RpcError::Transport(source)) => Err(ToolInvokeError::Unreachable { source }),
            Err(RpcError::Rpc { code, message }) => Err(ToolInvokeError::Rpc {
                tool: tool.to_string(),
                code,
                message,
            }),
            Err(RpcError::Invalid(reason)) => Err(ToolInvokeError::InvalidResponse { reason }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::routing::post;

    async fn rpc_fixture(Json(payload): Json<Value>) -> Json<Value> {
        let method = payload.get("method").and_then(Value::as_str).unwrap_or("");
        let id = payload.get("id").cloned().unwrap_or(Value::Null);
        let result = match method {
            "initialize" => json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "serverInfo": { "name": "fixture", "version": "0.0.0" }
            }),
            "notifications/initialized" => return Json(json!({})),
            "tools/list" => json!({
                "tools": [
                    { "name": "get-weather", "description": "Fetch weather data", "inputSchema": { "type": "object" } },
                    { "name": "get-balance" }
                ]
            }),
            "tools/call" => json!({
                "content": [{ "type": "text", "text": "72F and clear" }],
                "isError": false
            }),
            other => json!({ "error": format!("unexpected method {other}") }),
        };
        Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
    }

    async fn spawn_provider(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fixture listener");
        let addr = listener.local_addr().expect("fixture addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve fixture");
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn discovers_capabilities_by_name() {
        let endpoint = spawn_provider(Router::new().route(RPC_PATH, post(rpc_fixture))).await;
        let client = ToolClient::new(endpoint);

        let tools = client
            .discover_tools(DEFAULT_DISCOVERY_TIMEOUT_MS)
            .await
            .expect("discovery succeeds");

        assert_eq!(tools.len(), 2);
        let weather = tools.get("get-weather").expect("weather tool listed");
        assert_eq!(weather.description.as_deref(), Some("Fetch weather data"));
        assert!(weather.input_schema.is_some());
        assert!(tools.get("get-balance").expect("balance tool").description.is_none());
    }

    #[tokio::test]
    async fn empty_tool_list_is_a_valid_result() {
        let router = Router::new().route(
            RPC_PATH,
            post(|Json(payload): Json<Value>| async move {
                let id = payload.get("id").cloned().unwrap_or(Value::Null);
                Json(json!({ "jsonrpc": "2.0", "id": id, "result": { "tools": [] } }))
            }),
        );
        let endpoint = spawn_provider(router).await;
        let client = ToolClient::new(endpoint);

        let tools = client
            .discover_tools(DEFAULT_DISCOVERY_TIMEOUT_MS)
            .await
            .expect("empty listing is success");
        assert!(tools.is_empty());
    }

    #[tokio::test]
    async fn refused_connection_maps_to_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("reserve port");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = ToolClient::new(format!("http://{addr}"));
        let error = client
            .discover_tools(DEFAULT_DISCOVERY_TIMEOUT_MS)
            .await
            .expect_err("nothing is listening");
        assert!(matches!(error, ToolDiscoveryError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn slow_endpoint_maps_to_timeout() {
        let router = Router::new().route(
            RPC_PATH,
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({}))
            }),
        );
        let endpoint = spawn_provider(router).await;
        let client = ToolClient::new(endpoint);

        let error = client
            .discover_tools(100)
            .await
            .expect_err("discovery must be bounded");
        assert!(matches!(
            error,
            ToolDiscoveryError::Timeout { timeout_ms: 100, .. }
        ));
    }

    #[tokio::test]
    async fn invokes_discovered_tool() {
        let endpoint = spawn_provider(Router::new().route(RPC_PATH, post(rpc_fixture))).await;
        let client = ToolClient::new(endpoint);

        let result = client
            .invoke_tool("get-weather", json!({ "city": "Tokyo" }))
            .await
            .expect("invocation succeeds");
        assert_eq!(result["content"][0]["text"], "72F and clear");
    }
}
