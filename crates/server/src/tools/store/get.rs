//! store_get tool implementation.
//!
//! Looks up the stored response for a URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use biblio_client::canonicalize;
use biblio_core::store::EntryMeta;
use biblio_core::store::hash::compute_request_key;
use biblio_core::{Error, OfflineProxy};

use crate::tools::json_result;

/// Bodies larger than this are not echoed back as text.
const MAX_TEXT_BYTES: usize = 64 * 1024;

/// Parameters for the store_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreGetParams {
    /// Absolute URL of the request.
    pub url: String,

    /// Store to look in (default: the store serving requests).
    #[serde(default)]
    pub store: Option<String>,

    /// Request method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the store_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreGetOutput {
    pub store: String,
    pub entry: EntryMeta,
    /// Body as UTF-8, when it is text and small enough.
    pub text: Option<String>,
}

/// Implementation of the store_get tool.
pub async fn get_impl(proxy: &OfflineProxy, params: StoreGetParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let store = match params.store {
        Some(store) => store,
        None => proxy.serving_store().await,
    };

    let key = compute_request_key(&params.method, &url);
    let stored = proxy
        .db()
        .match_entry(&store, &key)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} {} in {}", params.method, url, store)))?;

    let text = if stored.body.len() <= MAX_TEXT_BYTES { String::from_utf8(stored.body.clone()).ok() } else { None };

    json_result(&StoreGetOutput { store, entry: stored.meta(), text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, proxy};

    #[tokio::test]
    async fn test_get_missing() {
        let proxy = proxy("v1").await;
        let params = StoreGetParams { url: "https://biblioteca.example.org/nope".into(), store: None, method: "GET".into() };

        let result = get_impl(&proxy, params).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_found() {
        let proxy = proxy("v1").await;
        proxy.register().await.unwrap();

        let params = StoreGetParams {
            url: "https://BIBLIOTECA.example.org/data/books.json#top".into(),
            store: None,
            method: "get".into(),
        };
        let result = get_impl(&proxy, params).await.unwrap();
        let found: StoreGetOutput = output(&result);

        assert_eq!(found.store, "biblioteca-cache-v1");
        assert_eq!(found.entry.status_code, 200);
        assert_eq!(found.entry.content_type.as_deref(), Some("application/json"));
        assert_eq!(found.text.as_deref(), Some(r#"{"path":"/data/books.json"}"#));
    }
}
