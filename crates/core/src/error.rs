//! Unified error types for seo-lens.
//!
//! `Error` is `Clone` because a single computation outcome is broadcast to
//! every caller waiting on the same cache key.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Reasons the renderer could not produce a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Navigation or content retrieval exceeded the fetch timeout.
    #[error("render timeout after {0}ms")]
    Timeout(u64),

    /// The browser could not navigate to the URL (DNS, TLS, connection reset...).
    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    /// The request was blocked by the client, a policy or the remote site.
    #[error("blocked: {0}")]
    Blocked(String),

    /// The page answered with a non-2xx status.
    #[error("http status {0}")]
    HttpStatus(u16),

    /// Failed to launch or connect to the browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// The page loaded but its content could not be read back.
    #[error("content retrieval failed: {0}")]
    ContentRetrieval(String),
}

/// Unified error type for the analysis core.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL list).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The URL cannot be turned into an analysis key.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The renderer could not produce a document.
    #[error("FETCH_FAILED: {0}")]
    FetchFailed(#[source] FetchError),

    /// The caller stopped waiting after this many milliseconds.
    #[error("TIMEOUT: gave up after {0}ms")]
    Timeout(u64),

    /// Cache bookkeeping reached a state that should be impossible.
    #[error("CACHE_CONSISTENCY: {0}")]
    CacheConsistency(String),
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        Error::FetchFailed(err)
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::FetchFailed(FetchError::Timeout(_)) => -32006,
            Error::FetchFailed(FetchError::HttpStatus(_)) => -32008,
            Error::FetchFailed(FetchError::Blocked(_)) => -32004,
            Error::FetchFailed(_) => -32012,
            Error::Timeout(_) => -32013,
            Error::CacheConsistency(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
