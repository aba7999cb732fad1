//! SEO signal extraction from rendered HTML.
//!
//! Extraction never fails: structural problems (missing title, several `<h1>`,
//! unparseable hrefs, ...) become [`Diagnostic`]s on the report. The output is
//! fully determined by the document and the page URL.

pub mod links;
pub mod meta;
pub mod text;

use std::sync::OnceLock;

use scraper::{Html, Selector};
use seolens_core::{Diagnostic, SelectorCount, SeoReport};
use url::Url;

pub use links::extract_links;

/// Per-request extraction settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// CSS selector whose matches are counted into the report.
    pub count_selector: Option<String>,
}

/// Build a [`SeoReport`] from a parsed document.
pub fn extract(document: &Html, page_url: &Url, options: &ExtractOptions) -> SeoReport {
    let base = meta::base_url(document, page_url);
    let mut diagnostics = Vec::new();

    let title = meta::title(document);
    if title.is_none() {
        diagnostics.push(Diagnostic::TitleMissing);
    }

    let meta_description = meta::description(document);
    if meta_description.is_none() {
        diagnostics.push(Diagnostic::MetaDescriptionMissing);
    }

    let canonical = match meta::canonical(document, &base) {
        Ok(canonical) => canonical,
        Err(diagnostic) => {
            diagnostics.push(diagnostic);
            None
        }
    };

    let headings = text::headings(document);
    match headings.iter().filter(|h| h.level == 1).count() {
        0 => diagnostics.push(Diagnostic::MissingH1),
        1 => {}
        count => diagnostics.push(Diagnostic::MultipleH1 { count }),
    }

    let (links, link_diagnostics) = extract_links(document, &base);
    diagnostics.extend(link_diagnostics);

    let selector_count = match options.count_selector.as_deref().map(str::trim) {
        Some(css) if !css.is_empty() => match Selector::parse(css) {
            Ok(selector) => Some(SelectorCount { selector: css.to_string(), count: document.select(&selector).count() }),
            Err(_) => {
                diagnostics.push(Diagnostic::InvalidSelector { selector: css.to_string() });
                None
            }
        },
        _ => None,
    };

    SeoReport {
        url: page_url.to_string(),
        title,
        meta_description,
        robots: meta::robots(document),
        canonical,
        headings,
        links,
        word_count: text::word_count(document),
        selector_count,
        diagnostics,
    }
}

/// Parse `html` and extract its report.
pub fn analyze_html(html: &str, page_url: &Url, options: &ExtractOptions) -> SeoReport {
    let document = Html::parse_document(html);
    extract(&document, page_url, options)
}

/// Compile a constant selector once.
pub(crate) fn selector(cell: &'static OnceLock<Selector>, css: &'static str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("invalid static selector"))
}

/// Join text fragments, collapsing every whitespace run to a single space.
pub(crate) fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}
