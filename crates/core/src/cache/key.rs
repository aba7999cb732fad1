//! Canonical cache keys for analysis requests.
//!
//! Two requests for the same logical page with the same options map to the
//! same key regardless of host case, query parameter order, fragments or
//! default ports.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::Error;

/// Per-request knobs that change what gets rendered or reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisOptions {
    /// Wait for the page to settle after DOMContentLoaded even when no
    /// client-side framework is detected.
    #[serde(default)]
    pub wait_for_network_idle: bool,

    /// CSS selector to wait for before the DOM is captured.
    #[serde(default)]
    pub wait_for: Option<String>,

    /// CSS selector whose matches are counted in the report (e.g. "h1").
    #[serde(default)]
    pub count_selector: Option<String>,
}

impl AnalysisOptions {
    /// Trim selectors and drop empty ones so equivalent options fingerprint alike.
    pub fn normalized(&self) -> Self {
        fn clean(s: &Option<String>) -> Option<String> {
            s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
        }

        Self {
            wait_for_network_idle: self.wait_for_network_idle,
            wait_for: clean(&self.wait_for),
            count_selector: clean(&self.count_selector),
        }
    }
}

/// Canonical identity of an analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnalysisKey {
    url: Url,
    options: AnalysisOptions,
    fingerprint: String,
}

impl AnalysisKey {
    /// Build a key from a user supplied URL and options.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` when the URL is empty, unparseable, has no
    /// host or uses a scheme other than http/https.
    pub fn new(url: &str, options: &AnalysisOptions) -> Result<Self, Error> {
        let url = canonicalize(url)?;
        let options = options.normalized();
        let fingerprint = fingerprint(&url, &options);
        Ok(Self { url, options, fingerprint })
    }

    /// The canonical URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Hex SHA-256 over the canonical URL and options.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl fmt::Display for AnalysisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.url, &self.fingerprint[..12])
    }
}

fn fingerprint(url: &Url, options: &AnalysisOptions) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(if options.wait_for_network_idle { b"idle" } else { b"load" });
    hasher.update(b"\n");
    hasher.update(options.wait_for.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"\n");
    hasher.update(options.count_selector.as_deref().unwrap_or("").as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonicalize a URL string for consistent caching.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host, drop the default port
/// 4. Remove fragment (#...)
/// 5. Sort raw query segments as written; drop an empty query
pub fn canonicalize(input: &str) -> Result<Url, Error> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty URL".into()));
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidUrl(format!("{trimmed}: missing host")));
    }

    parsed.set_fragment(None);

    let mut segments: Vec<String> =
        parsed.query().unwrap_or("").split('&').filter(|s| !s.is_empty()).map(str::to_string).collect();
    if segments.is_empty() {
        parsed.set_query(None);
    } else {
        segments.sort();
        parsed.set_query(Some(&segments.join("&")));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("example.com/a").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_canonicalize_lowercase_host_and_default_port() {
        let url = canonicalize("HTTPS://EXAMPLE.COM:443/Path").unwrap();
        assert_eq!(url.as_str(), "https://example.com/Path");
    }

    #[test]
    fn test_canonicalize_sorts_query() {
        let url = canonicalize("https://example.com/s?b=2&a=1&a=0").unwrap();
        assert_eq!(url.query(), Some("a=0&a=1&b=2"));
    }

    #[test]
    fn test_canonicalize_keeps_query_encoding() {
        let flag = canonicalize("https://example.com/?flag").unwrap();
        assert_eq!(flag.as_str(), "https://example.com/?flag");

        let raw = canonicalize("https://example.com/?q=a/b&x=%7E").unwrap();
        assert_eq!(raw.query(), Some("q=a/b&x=%7E"));

        let mixed = canonicalize("https://example.com/?b=1&a&&").unwrap();
        assert_eq!(mixed.query(), Some("a&b=1"));
    }

    #[test]
    fn test_key_is_usable_as_map_key() {
        use std::collections::HashMap;

        let opts = AnalysisOptions { count_selector: Some("h1".into()), ..Default::default() };
        let mut map = HashMap::new();
        map.insert(AnalysisKey::new("https://example.com/?b=2&a=1", &opts).unwrap(), 1);
        map.insert(AnalysisKey::new("https://EXAMPLE.com/?a=1&b=2#x", &opts).unwrap(), 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_canonicalize_drops_fragment_and_empty_query() {
        let url = canonicalize("https://example.com/p?#top").unwrap();
        assert_eq!(url.as_str(), "https://example.com/p");
    }

    #[test]
    fn test_canonicalize_rejects() {
        assert!(matches!(canonicalize(""), Err(Error::InvalidUrl(_))));
        assert!(matches!(canonicalize("   "), Err(Error::InvalidUrl(_))));
        assert!(matches!(canonicalize("file:///etc/passwd"), Err(Error::InvalidUrl(_))));
        assert!(matches!(canonicalize("https://"), Err(Error::InvalidUrl(_))));
        assert!(matches!(canonicalize("http://exa mple.com"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_key_query_order_is_irrelevant() {
        let opts = AnalysisOptions::default();
        let a = AnalysisKey::new("https://example.com/a?x=1&y=2", &opts).unwrap();
        let b = AnalysisKey::new("https://Example.com/a?y=2&x=1#frag", &opts).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_key_options_change_fingerprint() {
        let plain = AnalysisKey::new("https://example.com", &AnalysisOptions::default()).unwrap();
        let idle = AnalysisKey::new(
            "https://example.com",
            &AnalysisOptions { wait_for_network_idle: true, ..Default::default() },
        )
        .unwrap();
        let counted = AnalysisKey::new(
            "https://example.com",
            &AnalysisOptions { count_selector: Some("h2".into()), ..Default::default() },
        )
        .unwrap();

        assert_ne!(plain, idle);
        assert_ne!(plain, counted);
        assert_ne!(idle.fingerprint(), counted.fingerprint());
    }

    #[test]
    fn test_key_blank_selectors_are_ignored() {
        let a = AnalysisKey::new("https://example.com", &AnalysisOptions::default()).unwrap();
        let b = AnalysisKey::new(
            "https://example.com",
            &AnalysisOptions { wait_for: Some("  ".into()), count_selector: Some(String::new()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_format() {
        let key = AnalysisKey::new("https://example.com", &AnalysisOptions::default()).unwrap();
        assert_eq!(key.fingerprint().len(), 64);
        assert!(key.fingerprint().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(key.to_string().starts_with("https://example.com/ ["));
    }
}
