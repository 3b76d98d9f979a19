//! store_purge tool implementation.
//!
//! Purges store entries by URL pattern or count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use biblio_core::OfflineProxy;

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the store_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StorePurgeParams {
    /// Store to purge (default: the store serving requests).
    #[serde(default)]
    pub store: Option<String>,

    /// Purge entries whose URL contains this pattern.
    #[serde(default)]
    pub url_pattern: Option<String>,

    /// Keep only the newest N entries (LRU purge).
    #[serde(default)]
    pub max_entries: Option<usize>,
}

/// Output from the store_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorePurgeOutput {
    pub store: String,
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the store_purge tool.
pub async fn purge_impl(proxy: &OfflineProxy, params: StorePurgeParams) -> Result<CallToolResult, McpError> {
    if params.url_pattern.is_none() && params.max_entries.is_none() {
        return Err(ToolError::InvalidInput("At least one of url_pattern or max_entries must be specified".to_string()).into());
    }

    let store = match params.store {
        Some(store) => store,
        None => proxy.serving_store().await,
    };
    let db = proxy.db();
    let mut deleted_total = 0u64;

    if let Some(pattern) = params.url_pattern {
        deleted_total += db.purge_entries_by_url(&store, &pattern).await?;
    }

    if let Some(max_entries) = params.max_entries {
        deleted_total += db.purge_lru_entries(&store, max_entries).await?;
    }

    tracing::info!(store = %store, deleted = deleted_total, "store purged");
    json_result(&StorePurgeOutput { store, deleted: deleted_total })
}
