//! library_document tool implementation.
//!
//! Loads a data document the way a page would: through the proxy, trying
//! each plausible URL for it.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use biblio_client::{canonicalize, load_document};
use biblio_core::{Error, OfflineProxy};

use super::json_result;

/// Parameters for the library_document tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LibraryDocumentParams {
    /// Document path relative to the page, e.g. "data/books.json".
    pub path: String,

    /// URL of the page asking for it (default: the scope URL).
    #[serde(default)]
    pub page_url: Option<String>,
}

/// Output from the library_document tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LibraryDocumentOutput {
    /// URL the document was read from.
    pub url: String,
    pub document: serde_json::Value,
}

/// Implementation of the library_document tool.
pub async fn document_impl(proxy: &OfflineProxy, params: LibraryDocumentParams) -> Result<CallToolResult, McpError> {
    if params.path.trim().is_empty() {
        return Err(Error::InvalidInput("path must not be empty".into()).into());
    }

    let page = match &params.page_url {
        Some(page) => canonicalize(page).map_err(|e| Error::InvalidUrl(e.to_string()))?,
        None => proxy.config().scope.clone(),
    };

    let loaded = load_document(proxy, &page, params.path.trim()).await?;
    json_result(&LibraryDocumentOutput { url: loaded.url.to_string(), document: loaded.body })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{output, proxy};
    use super::*;

    #[tokio::test]
    async fn test_document_from_scope() {
        let proxy = proxy("v1").await;
        let params = LibraryDocumentParams { path: "data/faq.json".into(), page_url: None };

        let result = document_impl(&proxy, params).await.unwrap();
        let loaded: LibraryDocumentOutput = output(&result);
        assert_eq!(loaded.url, "https://biblioteca.example.org/data/faq.json");
        assert_eq!(loaded.document["path"], "/data/faq.json");
    }

    #[tokio::test]
    async fn test_document_rejects_empty_path() {
        let proxy = proxy("v1").await;
        let params = LibraryDocumentParams { path: "  ".into(), page_url: None };
        assert!(document_impl(&proxy, params).await.is_err());
    }
}
