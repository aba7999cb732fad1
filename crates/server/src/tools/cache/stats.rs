//! cache_stats tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use seolens_client::Analyzer;
use seolens_core::CacheStats;

use crate::tools::json_result;

/// Output from the cache_stats tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsOutput {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Share of lookups served without rendering.
    pub hit_ratio: f64,
    /// Live entries.
    pub size: usize,
    pub capacity: usize,
    pub ttl_seconds: u64,
}

/// Implementation of the cache_stats tool.
pub fn stats_impl(analyzer: &Analyzer) -> Result<CallToolResult, McpError> {
    let cache = analyzer.cache();
    let stats = cache.stats();

    let output = CacheStatsOutput {
        hit_ratio: stats.hit_ratio(),
        stats,
        size: cache.size(),
        capacity: cache.capacity(),
        ttl_seconds: cache.ttl().as_secs(),
    };

    json_result(&output)
}
