//! MCP tool implementations.
//!
//! This module contains all tools exposed by the seo-lens server.

pub mod analyze;
pub mod batch_analyze;
pub mod cache;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

pub use analyze::{SeoAnalyzeOutput, SeoAnalyzeParams};
pub use batch_analyze::{SeoBatchAnalyzeOutput, SeoBatchAnalyzeParams};

/// Wrap a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| McpError::internal_error(format!("failed to serialize output: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
