//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{
    analyze::{SeoAnalyzeParams, analyze_impl},
    batch_analyze::{SeoBatchAnalyzeParams, batch_analyze_impl},
    cache::{CacheInvalidateParams, clear_impl, invalidate_impl, stats_impl},
};

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
use seolens_client::Analyzer;

/// The main MCP server handler for seo-lens.
#[derive(Clone)]
pub struct SeoLensServer {
    tool_router: ToolRouter<Self>,
    analyzer: Analyzer,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SeoLensServer {
    /// Create a new server handler around a ready analyzer.
    pub fn new(analyzer: Analyzer) -> Self {
        Self { tool_router: Self::tool_router(), analyzer }
    }

    #[tool(
        description = "Render a URL and report its SEO signals: title, meta description, robots, canonical, heading outline, links, word count and diagnostics. Repeat requests within the TTL are served from cache."
    )]
    async fn seo_analyze(&self, params: Parameters<SeoAnalyzeParams>) -> Result<CallToolResult, McpError> {
        analyze_impl(&self.analyzer, params.0).await
    }

    #[tool(description = "Analyze several URLs in parallel with bounded concurrency. Results keep input order.")]
    async fn seo_batch_analyze(&self, params: Parameters<SeoBatchAnalyzeParams>) -> Result<CallToolResult, McpError> {
        batch_analyze_impl(&self.analyzer, params.0).await
    }

    #[tool(description = "Report cache hit/miss counters, size, capacity and TTL.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        stats_impl(&self.analyzer)
    }

    #[tool(description = "Drop the cached report for one URL and option set.")]
    async fn cache_invalidate(&self, params: Parameters<CacheInvalidateParams>) -> Result<CallToolResult, McpError> {
        invalidate_impl(&self.analyzer, params.0)
    }

    #[tool(description = "Drop every cached report.")]
    async fn cache_clear(&self) -> Result<CallToolResult, McpError> {
        clear_impl(&self.analyzer)
    }
}

impl ServerHandler for SeoLensServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "seo-lens".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some("Use seo_analyze to audit a page; reports are cached per URL and options.".into()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::analyzer;

    #[test]
    fn test_lists_all_tools() {
        let (analyzer, _) = analyzer();
        let server = SeoLensServer::new(analyzer);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_clear", "cache_invalidate", "cache_stats", "seo_analyze", "seo_batch_analyze"]);
    }

    #[test]
    fn test_server_info() {
        let (analyzer, _) = analyzer();
        let info = SeoLensServer::new(analyzer).get_info();
        assert_eq!(info.server_info.name, "seo-lens");
        assert!(info.capabilities.tools.is_some());
    }
}
