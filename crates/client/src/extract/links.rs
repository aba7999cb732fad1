//! Link harvesting from HTML documents.

use std::sync::OnceLock;

use scraper::{Html, Selector};
use seolens_core::{Diagnostic, Link};
use url::Url;

use super::{collapse_whitespace, selector};

static ANCHORS: OnceLock<Selector> = OnceLock::new();

/// Extract every `<a href>` in document order, resolving relative URLs against
/// `base_url`.
///
/// Duplicates are kept. Hrefs that are blank or cannot be resolved keep their
/// raw value, are flagged `malformed` and produce a [`Diagnostic::MalformedHref`].
pub fn extract_links(document: &Html, base_url: &Url) -> (Vec<Link>, Vec<Diagnostic>) {
    let mut links = Vec::new();
    let mut diagnostics = Vec::new();

    for element in document.select(selector(&ANCHORS, "a[href]")) {
        let raw = element.value().attr("href").unwrap_or_default();
        let text = collapse_whitespace(element.text());
        let rel: Vec<String> = element
            .value()
            .attr("rel")
            .map(|r| r.split_whitespace().map(str::to_ascii_lowercase).collect())
            .unwrap_or_default();

        let link = match resolve(raw, base_url) {
            Some(href) => Link { href, text, rel, malformed: false },
            None => {
                diagnostics.push(Diagnostic::MalformedHref { position: links.len(), href: raw.to_string() });
                Link { href: raw.to_string(), text, rel, malformed: true }
            }
        };
        links.push(link);
    }

    (links, diagnostics)
}

/// Resolve `href` against `base`, or `None` when it is blank or unparseable.
pub(crate) fn resolve(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(String::from)
}
