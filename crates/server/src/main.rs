//! seo-lens server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use seolens_client::{Analyzer, AnalyzerSettings, FetchConfig, HttpRenderer, Renderer};
use seolens_core::{AppConfig, ResultCache};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        ttl_seconds = config.ttl_seconds,
        capacity = config.capacity,
        render_enabled = config.render_enabled,
        "Starting seo-lens server on stdio transport"
    );

    let renderer: Arc<dyn Renderer> = match headless(&config).await? {
        Some(renderer) => renderer,
        None => Arc::new(HttpRenderer::new(FetchConfig::from_config(&config))?),
    };

    let cache = ResultCache::from_config(&config);
    let sweeper = config.sweep_interval().map(|every| cache.spawn_sweeper(every));
    let analyzer = Analyzer::new(cache, renderer, AnalyzerSettings::from_config(&config));

    let handler = handler::SeoLensServer::new(analyzer);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    Ok(())
}

#[cfg(feature = "render")]
async fn headless(config: &AppConfig) -> Result<Option<Arc<dyn Renderer>>> {
    if !config.render_enabled {
        return Ok(None);
    }
    let renderer = seolens_client::HeadlessRenderer::launch(&config.user_agent).await?;
    Ok(Some(Arc::new(renderer)))
}

#[cfg(not(feature = "render"))]
async fn headless(config: &AppConfig) -> Result<Option<Arc<dyn Renderer>>> {
    if config.render_enabled {
        tracing::warn!("built without the `render` feature, falling back to plain HTTP fetches");
    }
    Ok(None)
}
