use thiserror::Error;

/// Failure to enumerate capabilities from the remote tool provider. Always
/// recovered by the agent factory through degradation, never surfaced to the
/// gateway's callers.
#[derive(Debug, Error)]
pub enum ToolDiscoveryError {
    #[error("tool endpoint '{endpoint}' is unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("tool discovery against '{endpoint}' did not complete within {timeout_ms} ms")]
    Timeout { endpoint: String, timeout_ms: u64 },
    #[error("tool endpoint '{endpoint}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        endpoint: String,
        code: i64,
        message: String,
    },
    #[error("tool endpoint '{endpoint}' returned an invalid response: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

/// Failure to invoke a discovered tool mid-generation. Fed back to the model
/// as a failed tool result rather than aborting the request.
#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("tool '{tool}' is not available on this agent")]
    UnknownTool { tool: String },
    #[error("tool endpoint is unreachable: {source}")]
    Unreachable {
        #[source]
        source: reqwest::Error,
    },
    #[error("tool '{tool}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        tool: String,
        code: i64,
        message: String,
    },
    #[error("tool endpoint returned an invalid response: {reason}")]
    InvalidResponse { reason: String },
}
