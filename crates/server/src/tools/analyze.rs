//! seo_analyze tool implementation.
//!
//! Renders a URL, extracts its SEO report and serves repeats from the cache.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use seolens_client::Analyzer;
use seolens_core::{AnalysisOptions, Error, Origin, SeoReport};

use super::json_result;

/// Input parameters for seo_analyze tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SeoAnalyzeParams {
    /// The URL to analyze. `https://` is assumed when no scheme is given.
    pub url: String,

    /// How the page is rendered and what is counted.
    #[serde(flatten)]
    pub options: AnalysisOptions,

    /// Drop any cached report for this URL and options before analyzing.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Output structure for seo_analyze tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SeoAnalyzeOutput {
    /// The URL as requested.
    pub requested_url: String,
    /// Canonical form used as the cache key.
    pub normalized_url: String,
    /// Whether the report was served from the cache.
    pub cached: bool,
    /// Where the report came from.
    pub origin: Origin,
    pub report: SeoReport,
}

/// Implementation of the seo_analyze tool.
pub async fn analyze_impl(analyzer: &Analyzer, params: SeoAnalyzeParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let analysis = if params.force_refresh {
        analyzer.refresh(&params.url, &params.options).await?
    } else {
        analyzer.analyze_detailed(&params.url, &params.options).await?
    };

    let output = SeoAnalyzeOutput {
        requested_url: params.url,
        normalized_url: analysis.key.url().to_string(),
        cached: analysis.origin.is_cached(),
        origin: analysis.origin,
        report: SeoReport::clone(&analysis.report),
    };

    json_result(&output)
}
