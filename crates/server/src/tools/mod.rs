//! MCP tool implementations.
//!
//! This module contains all tools exposed by the biblio-proxy operator
//! surface.

pub mod document;
pub mod settings;
pub mod status;
pub mod store;
pub mod update;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub use document::LibraryDocumentParams;
pub use settings::{SettingsGetParams, SettingsSetParams};
pub use store::{StoreGetParams, StoreListParams, StorePurgeParams};
pub use update::ProxyUpdateParams;

/// Pretty JSON text result, the shape every tool answers with.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::OutputFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
