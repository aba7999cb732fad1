use std::time::{Duration, Instant};

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use seolens_core::FetchError;
use tokio::task::JoinHandle;
use url::Url;

use super::{RenderOptions, RenderedPage, Renderer, check_status};

const LAUNCH_ARGS: [&str; 5] = [
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--window-size=1280,720",
];

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const QUIET_PERIOD: Duration = Duration::from_millis(500);

const DETECT_FRAMEWORK: &str =
    "typeof window.React !== 'undefined' || typeof window.Vue !== 'undefined' || typeof window.ng !== 'undefined'";

const DOCUMENT_STATUS: &str = "(() => { \
    const nav = performance.getEntriesByType('navigation')[0]; \
    return nav && nav.responseStatus ? nav.responseStatus : 0; \
})()";

const DOCUMENT_READY: &str = "document.readyState === 'complete'";

/// Headless Chrome/Chromium renderer using chromiumoxide.
///
/// One browser process is shared by every render; each render opens and
/// closes its own tab.
pub struct HeadlessRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl HeadlessRenderer {
    /// Launch a headless browser that identifies itself with `user_agent`.
    ///
    /// The browser uses a background task to handle Chrome DevTools Protocol
    /// events for as long as the renderer lives.
    pub async fn launch(user_agent: &str) -> Result<Self, FetchError> {
        let config = BrowserConfig::builder()
            .args(LAUNCH_ARGS)
            .arg(format!("--user-agent={user_agent}"))
            .build()
            .map_err(FetchError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        tracing::info!("headless browser launched");
        Ok(Self { browser, handler })
    }

    async fn load(&self, page: &Page, url: &Url, opts: &RenderOptions) -> Result<(String, Url, Option<u16>), FetchError> {
        page.goto(url.as_str()).await.map_err(|e| navigation_error(&e.to_string()))?;

        let status = eval::<u16>(page, DOCUMENT_STATUS).await.filter(|code| *code != 0);
        check_status(status)?;

        let framework = eval::<bool>(page, DETECT_FRAMEWORK).await.unwrap_or(false);
        if framework || opts.wait_for_network_idle {
            tracing::debug!(%url, framework, "waiting for page to settle");
            wait_until_settled(page, opts.settle_timeout).await;
        }

        if let Some(selector) = &opts.wait_for {
            wait_for_selector(page, selector).await?;
        }

        let html = page.content().await.map_err(|e| FetchError::ContentRetrieval(e.to_string()))?;

        let page_url = page.url().await.map_err(|e| FetchError::ContentRetrieval(e.to_string()))?;
        let final_url = page_url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .unwrap_or_else(|| url.clone());

        Ok((html, final_url, status))
    }
}

impl Drop for HeadlessRenderer {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait::async_trait]
impl Renderer for HeadlessRenderer {
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, FetchError> {
        let start = Instant::now();

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::NavigationFailed(e.to_string()))?;

        let loaded = tokio::time::timeout(opts.timeout, self.load(&page, url, opts)).await;

        if let Err(e) = page.close().await {
            tracing::debug!("failed to close page: {e}");
        }

        let (html, final_url, status) = loaded.map_err(|_| FetchError::Timeout(opts.timeout_ms()))??;
        let render_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("rendered {} -> {} in {}ms ({} bytes)", url, final_url, render_ms, html.len());
        Ok(RenderedPage { html, final_url, status, render_ms })
    }
}

async fn eval<T: serde::de::DeserializeOwned>(page: &Page, expression: &str) -> Option<T> {
    match page.evaluate(expression).await {
        Ok(result) => result.into_value::<T>().ok(),
        Err(e) => {
            tracing::debug!("page evaluation failed: {e}");
            None
        }
    }
}

/// Wait until the document reports `complete` and then a short quiet period.
///
/// Gives up silently at `limit` and captures whatever has rendered so far.
async fn wait_until_settled(page: &Page, limit: Duration) {
    let settled = tokio::time::timeout(limit, async {
        while !eval::<bool>(page, DOCUMENT_READY).await.unwrap_or(false) {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        tokio::time::sleep(QUIET_PERIOD).await;
    })
    .await;

    if settled.is_err() {
        tracing::warn!(limit_ms = limit.as_millis() as u64, "page did not settle in time, capturing anyway");
    }
}

/// Poll for `selector` until it appears. The caller bounds the wait.
async fn wait_for_selector(page: &Page, selector: &str) -> Result<(), FetchError> {
    loop {
        match page.find_element(selector).await {
            Ok(_) => return Ok(()),
            Err(e) if e.to_string().contains("invalid selector") => {
                return Err(FetchError::ContentRetrieval(format!("invalid wait_for selector `{selector}`")));
            }
            Err(_) => tokio::time::sleep(POLL_INTERVAL).await,
        }
    }
}

fn navigation_error(message: &str) -> FetchError {
    if message.contains("ERR_BLOCKED") {
        FetchError::Blocked(message.to_string())
    } else {
        FetchError::NavigationFailed(message.to_string())
    }
}
