//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the ingestion service.
use std::sync::Arc;

use crate::ingest::IngestService;
use crate::tools::{ListUrlsParams, StoreUrlsParams, list_urls_impl, store_urls_impl};

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

/// The main MCP server handler for linkstash.
#[derive(Clone)]
pub struct LinkstashServer {
    tool_router: ToolRouter<Self>,
    ingest: Arc<IngestService>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl LinkstashServer {
    /// Create a new server handler over the given ingestion service.
    pub fn new(ingest: Arc<IngestService>) -> Self {
        Self { tool_router: Self::tool_router(), ingest }
    }

    /// Store a batch of URLs.
    ///
    /// New URLs are fetched (following up to the configured number of redirects) and persisted,
    /// known URLs are answered from the store.
    #[tool(
        description = "Store a batch of URLs. Fetches URLs not seen before and returns the stored records split into success and failed, with content inlined for successes."
    )]
    async fn store_urls(&self, params: Parameters<StoreUrlsParams>) -> Result<CallToolResult, McpError> {
        store_urls_impl(&self.ingest, params.0).await
    }

    /// List every stored URL record.
    #[tool(description = "List every stored URL with its status, redirects and, for successful fetches, its content.")]
    async fn list_urls(&self, params: Parameters<ListUrlsParams>) -> Result<CallToolResult, McpError> {
        list_urls_impl(&self.ingest, params.0).await
    }
}

impl ServerHandler for LinkstashServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "linkstash".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Use store_urls to save and fetch web pages, list_urls to read everything stored. \
                 Stored pages are refetched in the background once they go stale."
                    .into(),
            ),
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
