//! store_list tool implementation.
//!
//! Lists stores, and optionally the entries of one of them.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use biblio_core::OfflineProxy;
use biblio_core::store::{EntryMeta, StoreInfo};

use crate::tools::json_result;

/// Parameters for the store_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StoreListParams {
    /// List the entries of this store as well.
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the store_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreListOutput {
    pub stores: Vec<StoreInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntryMeta>>,
}

/// Implementation of the store_list tool.
pub async fn list_impl(proxy: &OfflineProxy, params: StoreListParams) -> Result<CallToolResult, McpError> {
    let db = proxy.db();
    let stores = db.list_stores().await?;

    let entries = match params.store {
        Some(store) => Some(db.list_entries(&store).await?),
        None => None,
    };

    json_result(&StoreListOutput { stores, entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, proxy};

    #[tokio::test]
    async fn test_list_stores_and_entries() {
        let proxy = proxy("v1").await;
        proxy.register().await.unwrap();

        let result = list_impl(&proxy, StoreListParams::default()).await.unwrap();
        let listing: StoreListOutput = output(&result);
        assert_eq!(listing.stores.len(), 1);
        assert!(listing.entries.is_none());

        let params = StoreListParams { store: Some("biblioteca-cache-v1".into()) };
        let result = list_impl(&proxy, params).await.unwrap();
        let listing: StoreListOutput = output(&result);
        let entries = listing.entries.unwrap();
        assert_eq!(entries.len(), 11);
        assert!(entries.iter().any(|e| e.url.ends_with("/data/books.json")));
    }
}
