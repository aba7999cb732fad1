//! Plain HTTP renderer.
//!
//! Fetches the raw document with a GET and does not execute JavaScript, so
//! `wait_for` and the settle options have no effect. Used when headless
//! rendering is disabled or unavailable.
//!
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Non-2xx statuses are failures and never reach the extractor.

use std::time::{Duration, Instant};

use reqwest::{Client, header};
use seolens_core::{AppConfig, FetchError};
use url::Url;

use crate::render::{RenderOptions, RenderedPage, Renderer, check_status};

/// Configuration for the HTTP renderer.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string.
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: seolens_core::config::DEFAULT_USER_AGENT.to_string(),
            max_bytes: 5 * 1024 * 1024,
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), ..Self::default() }
    }
}

/// [`Renderer`] backed by a reqwest client.
pub struct HttpRenderer {
    http: Client,
    config: FetchConfig,
}

impl HttpRenderer {
    /// Create a new HTTP renderer with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::NavigationFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: usize) -> FetchError {
        FetchError::ContentRetrieval(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

#[async_trait::async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, FetchError> {
        let start = Instant::now();

        if opts.wait_for.is_some() {
            tracing::debug!(%url, "wait_for is ignored without a browser");
        }

        let response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .timeout(opts.timeout)
            .send()
            .await
            .map_err(|e| request_error(&e, opts.timeout))?;

        let status = response.status().as_u16();
        check_status(Some(status))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let final_url = response.url().clone();
        let body = response.bytes().await.map_err(|e| request_error(&e, opts.timeout))?;

        if body.len() > self.config.max_bytes {
            return Err(self.too_large(body.len()));
        }

        let html = String::from_utf8_lossy(&body).into_owned();
        let render_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, final_url, render_ms, html.len());

        Ok(RenderedPage { html, final_url, status: Some(status), render_ms })
    }
}

fn request_error(e: &reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout.as_millis() as u64)
    } else if e.is_body() || e.is_decode() {
        FetchError::ContentRetrieval(e.to_string())
    } else {
        FetchError::NavigationFailed(format!("network error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a loopback port.
    async fn serve_once(status_line: &'static str, body: &'static str, delay: Duration) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(delay).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });

        Url::parse(&format!("http://{addr}/page")).unwrap()
    }

    fn opts(timeout: Duration) -> RenderOptions {
        RenderOptions { timeout, ..RenderOptions::default() }
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, seolens_core::config::DEFAULT_USER_AGENT);
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "seo-lens-test".into(), ..Default::default() };
        assert_eq!(FetchConfig::from_config(&app).user_agent, "seo-lens-test");
    }

    #[tokio::test]
    async fn test_http_renderer_new() {
        assert!(HttpRenderer::new(FetchConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_render_success() {
        let url = serve_once("200 OK", "<html><title>Hi</title></html>", Duration::ZERO).await;
        let renderer = HttpRenderer::new(FetchConfig::default()).unwrap();

        let page = renderer.render(&url, &opts(Duration::from_secs(5))).await.unwrap();
        assert_eq!(page.status, Some(200));
        assert_eq!(page.final_url, url);
        assert!(page.html.contains("<title>Hi</title>"));
    }

    #[tokio::test]
    async fn test_render_error_status() {
        let url = serve_once("500 Internal Server Error", "oops", Duration::ZERO).await;
        let renderer = HttpRenderer::new(FetchConfig::default()).unwrap();

        let err = renderer.render(&url, &opts(Duration::from_secs(5))).await.unwrap_err();
        assert_eq!(err, FetchError::HttpStatus(500));
    }

    #[tokio::test]
    async fn test_render_timeout() {
        let url = serve_once("200 OK", "late", Duration::from_secs(3)).await;
        let renderer = HttpRenderer::new(FetchConfig::default()).unwrap();

        let err = renderer.render(&url, &opts(Duration::from_millis(200))).await.unwrap_err();
        assert_eq!(err, FetchError::Timeout(200));
    }

    #[tokio::test]
    async fn test_render_too_large() {
        let url = serve_once("200 OK", "0123456789", Duration::ZERO).await;
        let config = FetchConfig { max_bytes: 4, ..FetchConfig::default() };
        let renderer = HttpRenderer::new(config).unwrap();

        let err = renderer.render(&url, &opts(Duration::from_secs(5))).await.unwrap_err();
        assert!(matches!(err, FetchError::ContentRetrieval(_)));
    }
}
