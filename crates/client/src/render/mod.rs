//! Page rendering for analysis.
//!
//! The analyzer only sees the [`Renderer`] trait. Two implementations exist:
//! [`HeadlessRenderer`] drives headless Chromium through chromiumoxide
//! (feature `render`), and [`crate::fetch::HttpRenderer`] performs a plain GET
//! for hosts without a browser.

use std::time::Duration;

use seolens_core::FetchError;
use url::Url;

#[cfg(feature = "render")]
mod headless;

#[cfg(feature = "render")]
pub use headless::HeadlessRenderer;

/// Options for rendering a page.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Overall budget for navigation plus content capture (default: 30s).
    pub timeout: Duration,

    /// Optional CSS selector to wait for before capturing the DOM.
    pub wait_for: Option<String>,

    /// Wait for the page to settle even when no client-side framework is detected.
    pub wait_for_network_idle: bool,

    /// Upper bound on the settle wait (default: 15s).
    pub settle_timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30_000),
            wait_for: None,
            wait_for_network_idle: false,
            settle_timeout: Duration::from_millis(15_000),
        }
    }
}

impl RenderOptions {
    pub(crate) fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Result of rendering a page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Rendered HTML content.
    pub html: String,

    /// Final URL after redirects.
    pub final_url: Url,

    /// HTTP status of the main document, when known.
    pub status: Option<u16>,

    /// Time taken to render in milliseconds.
    pub render_ms: u64,
}

/// Renderer trait: turns a URL into a rendered HTML document.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, FetchError>;
}

/// Reject non-2xx document statuses.
pub(crate) fn check_status(status: Option<u16>) -> Result<(), FetchError> {
    match status {
        Some(code) if !(200..300).contains(&code) => Err(FetchError::HttpStatus(code)),
        _ => Ok(()),
    }
}
