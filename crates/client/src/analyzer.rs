//! Analyzer service: cache lookup, render on miss, extract, populate.

use std::sync::Arc;
use std::time::Duration;

use seolens_core::{AnalysisKey, AnalysisOptions, AppConfig, Error, Origin, ResultCache, SeoReport};
use url::Url;

use crate::extract::{ExtractOptions, analyze_html};
use crate::render::{RenderOptions, Renderer};

/// Timeouts applied to every analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerSettings {
    /// Budget handed to the renderer for one page.
    pub fetch_timeout: Duration,
    /// Upper bound on the renderer's settle wait.
    pub settle_timeout: Duration,
    /// How long one caller waits for a report, cached or not.
    pub analyze_timeout: Duration,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AnalyzerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            fetch_timeout: config.fetch_timeout(),
            settle_timeout: config.settle_timeout(),
            analyze_timeout: config.analyze_timeout(),
        }
    }

    /// Renderer options for one request.
    pub fn render_options(&self, options: &AnalysisOptions) -> RenderOptions {
        RenderOptions {
            timeout: self.fetch_timeout,
            wait_for: options.wait_for.clone(),
            wait_for_network_idle: options.wait_for_network_idle,
            settle_timeout: self.settle_timeout,
        }
    }
}

/// A report together with how it was obtained.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub key: AnalysisKey,
    pub report: Arc<SeoReport>,
    pub origin: Origin,
}

/// Entry point for request handlers.
///
/// Cloning is cheap; clones share the cache and the renderer.
#[derive(Clone)]
pub struct Analyzer {
    cache: ResultCache<SeoReport>,
    renderer: Arc<dyn Renderer>,
    settings: AnalyzerSettings,
}

impl Analyzer {
    pub fn new(cache: ResultCache<SeoReport>, renderer: Arc<dyn Renderer>, settings: AnalyzerSettings) -> Self {
        Self { cache, renderer, settings }
    }

    pub fn cache(&self) -> &ResultCache<SeoReport> {
        &self.cache
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    /// Report for `url`, rendering and extracting only when no live entry exists.
    pub async fn analyze(&self, url: &str, options: &AnalysisOptions) -> Result<Arc<SeoReport>, Error> {
        self.analyze_detailed(url, options).await.map(|analysis| analysis.report)
    }

    /// Like [`analyze`](Self::analyze), also returning the key and the origin.
    pub async fn analyze_detailed(&self, url: &str, options: &AnalysisOptions) -> Result<Analysis, Error> {
        let key = AnalysisKey::new(url, options)?;
        self.run(key).await
    }

    /// Drop any cached report for `url` and analyze it again.
    pub async fn refresh(&self, url: &str, options: &AnalysisOptions) -> Result<Analysis, Error> {
        let key = AnalysisKey::new(url, options)?;
        if self.cache.invalidate(&key) {
            tracing::debug!(%key, "invalidated before refresh");
        }
        self.run(key).await
    }

    /// Drop the cached report for `url`. Returns whether anything was removed.
    pub fn invalidate(&self, url: &str, options: &AnalysisOptions) -> Result<bool, Error> {
        let key = AnalysisKey::new(url, options)?;
        Ok(self.cache.invalidate(&key))
    }

    async fn run(&self, key: AnalysisKey) -> Result<Analysis, Error> {
        let renderer = Arc::clone(&self.renderer);
        let target = key.url().clone();
        let render_opts = self.settings.render_options(key.options());
        let extract_opts = ExtractOptions { count_selector: key.options().count_selector.clone() };

        let budget = self.settings.analyze_timeout;
        let pending = self
            .cache
            .resolve(key.clone(), move || fetch_and_extract(renderer, target, render_opts, extract_opts));

        let resolved = match tokio::time::timeout(budget, pending).await {
            Ok(resolved) => resolved?,
            Err(_) => {
                tracing::warn!(%key, budget_ms = budget.as_millis() as u64, "analysis timed out");
                return Err(Error::Timeout(budget.as_millis() as u64));
            }
        };

        tracing::info!(%key, origin = ?resolved.origin, "analysis complete");
        Ok(Analysis { key, report: resolved.value, origin: resolved.origin })
    }
}

async fn fetch_and_extract(
    renderer: Arc<dyn Renderer>, url: Url, render_opts: RenderOptions, extract_opts: ExtractOptions,
) -> Result<SeoReport, Error> {
    let page = renderer.render(&url, &render_opts).await.map_err(|e| {
        tracing::warn!(%url, error = %e, "render failed");
        Error::FetchFailed(e)
    })?;

    let report = analyze_html(&page.html, &page.final_url, &extract_opts);
    tracing::debug!(
        %url,
        final_url = %page.final_url,
        render_ms = page.render_ms,
        diagnostics = report.diagnostics.len(),
        "page extracted"
    );
    Ok(report)
}
