pub mod client;
pub mod error;
pub mod interface;

pub use client::{DEFAULT_DISCOVERY_TIMEOUT_MS, ToolClient};
pub use error::{ToolDiscoveryError, ToolInvokeError};
pub use interface::{ToolCapability, ToolInvoker};
