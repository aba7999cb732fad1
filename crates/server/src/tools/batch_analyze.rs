//! seo_batch_analyze tool implementation.
//!
//! Analyzes multiple URLs in parallel with bounded concurrency. Duplicate URLs
//! in one batch share a single render through the cache.

use std::sync::Arc;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use seolens_client::Analyzer;
use seolens_core::{AnalysisOptions, Error, Origin, SeoReport};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::json_result;

const MAX_CONCURRENCY: u8 = 16;

/// Input parameters for seo_batch_analyze tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SeoBatchAnalyzeParams {
    /// URLs to analyze.
    pub urls: Vec<String>,

    /// Options applied to every URL.
    #[serde(flatten)]
    pub options: AnalysisOptions,

    /// Drop cached reports before analyzing.
    #[serde(default)]
    pub force_refresh: bool,

    /// Maximum number of concurrent analyses (default: 4, max: 16).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: Option<u8>,

    /// Fail fast: stop on first error (default: false).
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_max_concurrency() -> Option<u8> {
    Some(4)
}

/// Batch item status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchItemStatus {
    /// Rendered and extracted for this request.
    Analyzed,
    /// Returned from cache or shared with a concurrent request.
    Cached,
    /// Failed to fetch or extract.
    Failed,
}

/// Individual batch result item.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchItem {
    /// The URL as given.
    pub url: String,
    /// Status of this item.
    pub status: BatchItemStatus,
    /// The report (if status is Analyzed or Cached).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SeoReport>,
    /// Error message (if status is Failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch summary statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchSummary {
    /// Number of URLs with a result.
    pub total: u32,
    pub analyzed: u32,
    pub cached: u32,
    pub failed: u32,
}

/// Output structure for seo_batch_analyze tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SeoBatchAnalyzeOutput {
    /// Individual results in input order. With `fail_fast`, URLs still pending
    /// at the first failure are left out.
    pub results: Vec<BatchItem>,
    /// Summary statistics.
    pub summary: BatchSummary,
}

/// Implementation of the seo_batch_analyze tool.
pub async fn batch_analyze_impl(
    analyzer: &Analyzer, params: SeoBatchAnalyzeParams,
) -> Result<CallToolResult, McpError> {
    if params.urls.is_empty() {
        return Err(Error::InvalidInput("urls cannot be empty".into()).into());
    }

    let max_concurrency = params.max_concurrency.unwrap_or(4).min(MAX_CONCURRENCY) as usize;
    if max_concurrency == 0 {
        return Err(Error::InvalidInput("max_concurrency must be at least 1".into()).into());
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrency));
    let mut join_set = JoinSet::new();

    for (index, url) in params.urls.iter().cloned().enumerate() {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let analyzer = analyzer.clone();
        let options = params.options.clone();
        let force_refresh = params.force_refresh;

        join_set.spawn(async move {
            let _permit = permit;
            let result = if force_refresh {
                analyzer.refresh(&url, &options).await
            } else {
                analyzer.analyze_detailed(&url, &options).await
            };
            (index, url, result)
        });
    }

    let mut slots: Vec<Option<BatchItem>> = vec![None; params.urls.len()];
    let mut summary = BatchSummary::default();

    while let Some(joined) = join_set.join_next().await {
        let (index, url, result) = joined.map_err(|e| McpError::internal_error(e.to_string(), None))?;

        let item = match result {
            Ok(analysis) => {
                let status = match analysis.origin {
                    Origin::Computed => {
                        summary.analyzed += 1;
                        BatchItemStatus::Analyzed
                    }
                    Origin::Cache | Origin::Coalesced => {
                        summary.cached += 1;
                        BatchItemStatus::Cached
                    }
                };
                BatchItem { url, status, report: Some(SeoReport::clone(&analysis.report)), error: None }
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "batch item failed");
                summary.failed += 1;
                BatchItem { url, status: BatchItemStatus::Failed, report: None, error: Some(e.to_string()) }
            }
        };
        slots[index] = Some(item);

        if params.fail_fast && summary.failed > 0 {
            join_set.shutdown().await;
            break;
        }
    }

    let results: Vec<BatchItem> = slots.into_iter().flatten().collect();
    summary.total = results.len() as u32;

    json_result(&SeoBatchAnalyzeOutput { results, summary })
}
