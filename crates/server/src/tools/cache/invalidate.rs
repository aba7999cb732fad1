//! cache_invalidate tool implementation.
//!
//! Drops the cached report for one URL and option set.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use seolens_client::Analyzer;
use seolens_core::{AnalysisKey, AnalysisOptions};

use crate::tools::json_result;

/// Parameters for the cache_invalidate tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheInvalidateParams {
    /// The URL whose report should be dropped.
    pub url: String,

    /// Options the report was produced with.
    #[serde(flatten)]
    pub options: AnalysisOptions,
}

/// Output from the cache_invalidate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInvalidateOutput {
    /// Canonical form of the URL.
    pub normalized_url: String,
    /// Whether an entry or an in-flight analysis was dropped.
    pub removed: bool,
}

/// Implementation of the cache_invalidate tool.
pub fn invalidate_impl(analyzer: &Analyzer, params: CacheInvalidateParams) -> Result<CallToolResult, McpError> {
    let key = AnalysisKey::new(&params.url, &params.options)?;
    let removed = analyzer.cache().invalidate(&key);
    tracing::info!(%key, removed, "cache invalidate");

    json_result(&CacheInvalidateOutput { normalized_url: key.url().to_string(), removed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{analyzer, output};

    #[tokio::test]
    async fn test_invalidate_existing_and_missing() {
        let (analyzer, _) = analyzer();
        analyzer.analyze("https://example.com/a", &AnalysisOptions::default()).await.unwrap();

        let params = CacheInvalidateParams { url: "example.com/a#frag".into(), ..Default::default() };
        let out: CacheInvalidateOutput = output(&invalidate_impl(&analyzer, params.clone()).unwrap());
        assert!(out.removed);
        assert_eq!(out.normalized_url, "https://example.com/a");
        assert_eq!(analyzer.cache().size(), 0);

        let again: CacheInvalidateOutput = output(&invalidate_impl(&analyzer, params).unwrap());
        assert!(!again.removed);
    }

    #[tokio::test]
    async fn test_invalidate_respects_options() {
        let (analyzer, _) = analyzer();
        analyzer.analyze("https://example.com/", &AnalysisOptions::default()).await.unwrap();

        let params = CacheInvalidateParams {
            url: "https://example.com/".into(),
            options: AnalysisOptions { count_selector: Some("h1".into()), ..Default::default() },
        };
        let out: CacheInvalidateOutput = output(&invalidate_impl(&analyzer, params).unwrap());
        assert!(!out.removed);
        assert_eq!(analyzer.cache().size(), 1);
    }

    #[test]
    fn test_invalidate_invalid_url() {
        let (analyzer, _) = analyzer();
        let params = CacheInvalidateParams { url: String::new(), ..Default::default() };
        let err = invalidate_impl(&analyzer, params).unwrap_err();
        assert_eq!(err.code.0, -32003);
    }
}
