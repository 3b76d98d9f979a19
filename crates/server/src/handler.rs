//! MCP server handler implementation.
//!
//! This module defines the operator-facing server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    LibraryDocumentParams, ProxyUpdateParams, SettingsGetParams, SettingsSetParams, StoreGetParams, StoreListParams,
    StorePurgeParams, document, settings, status, store, update,
};

use biblio_core::{OfflineProxy, SettingsManager};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for biblio-proxy.
#[derive(Clone)]
pub struct LibraryServer {
    proxy: Arc<OfflineProxy>,
    settings: Arc<SettingsManager>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl LibraryServer {
    /// Create a new server handler over a shared proxy and settings.
    pub fn new(proxy: Arc<OfflineProxy>, settings: Arc<SettingsManager>) -> Self {
        Self { proxy, settings, tool_router: Self::tool_router() }
    }

    #[tool(description = "Report the offline proxy lifecycle phase, active and waiting generations, and stores with entry counts.")]
    async fn proxy_status(&self) -> Result<CallToolResult, McpError> {
        status::status_impl(&self.proxy).await
    }

    /// Re-run registration for the configured generation.
    #[tool(
        description = "Install the configured generation if needed and activate it. Set activate=true to promote a waiting generation immediately."
    )]
    async fn proxy_update(&self, params: Parameters<ProxyUpdateParams>) -> Result<CallToolResult, McpError> {
        update::update_impl(&self.proxy, params.0).await
    }

    #[tool(description = "List stores with entry counts. Pass a store name to also list its entries (metadata only).")]
    async fn store_list(&self, params: Parameters<StoreListParams>) -> Result<CallToolResult, McpError> {
        store::list_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Look up the stored response for a URL. Returns metadata and the body when it is small text.")]
    async fn store_get(&self, params: Parameters<StoreGetParams>) -> Result<CallToolResult, McpError> {
        store::get_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Purge store entries by URL pattern or keep only the newest N entries.")]
    async fn store_purge(&self, params: Parameters<StorePurgeParams>) -> Result<CallToolResult, McpError> {
        store::purge_impl(&self.proxy, params.0).await
    }

    /// Load a data document through the proxy.
    ///
    /// Tries the document relative to the page directory, the page itself
    /// and the origin root, returning the first JSON body.
    #[tool(description = "Load a JSON data document (e.g. data/books.json) through the offline proxy, as a page would.")]
    async fn library_document(&self, params: Parameters<LibraryDocumentParams>) -> Result<CallToolResult, McpError> {
        document::document_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Get the theme and language settings, optionally as seen by a page URL with theme=/lang= query values.")]
    async fn settings_get(&self, params: Parameters<SettingsGetParams>) -> Result<CallToolResult, McpError> {
        settings::get_impl(&self.settings, params.0).await
    }

    #[tool(description = "Persist a new theme (light|dark) and/or language (pt|en).")]
    async fn settings_set(&self, params: Parameters<SettingsSetParams>) -> Result<CallToolResult, McpError> {
        settings::set_impl(&self.settings, params.0).await
    }
}

impl ServerHandler for LibraryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "biblio-proxy".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
