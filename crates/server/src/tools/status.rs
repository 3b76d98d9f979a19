//! proxy_status tool implementation.
//!
//! Reports the lifecycle phase, the generations involved and every store
//! with its entry count.

use rmcp::{ErrorData as McpError, model::CallToolResult};

use biblio_core::OfflineProxy;

use super::json_result;

/// Implementation of the proxy_status tool.
pub async fn status_impl(proxy: &OfflineProxy) -> Result<CallToolResult, McpError> {
    let status = proxy.status().await?;
    json_result(&status)
}
