//! cache_clear tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use seolens_client::Analyzer;

use crate::tools::json_result;

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Number of entries dropped.
    pub cleared: usize,
}

/// Implementation of the cache_clear tool.
pub fn clear_impl(analyzer: &Analyzer) -> Result<CallToolResult, McpError> {
    let cleared = analyzer.cache().clear();
    json_result(&CacheClearOutput { cleared })
}
