//! Document head signals: title, meta tags, canonical and base URL.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};
use seolens_core::Diagnostic;
use url::Url;

use super::{collapse_whitespace, links, selector};

static BASE: OnceLock<Selector> = OnceLock::new();
static TITLE: OnceLock<Selector> = OnceLock::new();
static NAMED_META: OnceLock<Selector> = OnceLock::new();
static REL_LINKS: OnceLock<Selector> = OnceLock::new();

/// The first `<base href>` resolved against the page URL, else the page URL.
pub fn base_url(document: &Html, page_url: &Url) -> Url {
    document
        .select(selector(&BASE, "base[href]"))
        .next()
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone())
}

/// Text of the first `<title>`, `None` when absent or blank.
pub fn title(document: &Html) -> Option<String> {
    let title = document.select(selector(&TITLE, "title")).next()?;
    non_empty(collapse_whitespace(title.text()))
}

/// Content of the first `<meta name="description">`.
pub fn description(document: &Html) -> Option<String> {
    named_meta(document, "description")
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .and_then(|content| non_empty(content.trim().to_string()))
}

/// Directive tokens across every `<meta name="robots">`.
pub fn robots(document: &Html) -> BTreeSet<String> {
    named_meta(document, "robots")
        .filter_map(|meta| meta.value().attr("content"))
        .flat_map(|content| content.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Target of the first `<link rel="canonical">`, resolved against `base`.
///
/// An href that cannot be resolved is reported as
/// [`Diagnostic::InvalidCanonical`].
pub fn canonical(document: &Html, base: &Url) -> Result<Option<String>, Diagnostic> {
    let Some(link) = document
        .select(selector(&REL_LINKS, "link[rel]"))
        .find(|link| has_rel(link, "canonical"))
    else {
        return Ok(None);
    };

    let href = link.value().attr("href").unwrap_or_default();
    match links::resolve(href, base) {
        Some(resolved) => Ok(Some(resolved)),
        None => Err(Diagnostic::InvalidCanonical { href: href.to_string() }),
    }
}

fn named_meta<'a>(document: &'a Html, name: &'static str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    document
        .select(selector(&NAMED_META, "meta[name]"))
        .filter(move |meta| meta.value().attr("name").is_some_and(|n| n.trim().eq_ignore_ascii_case(name)))
}

fn has_rel(element: &ElementRef<'_>, token: &str) -> bool {
    element
        .value()
        .attr("rel")
        .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case(token)))
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://example.com/blog/post").unwrap()
    }

    #[test]
    fn test_title_collapses_whitespace() {
        let doc = Html::parse_document("<title>\n  Hello\n   World </title>");
        assert_eq!(title(&doc).as_deref(), Some("Hello World"));
    }

    #[test]
    fn test_title_uses_first_element() {
        let doc = Html::parse_document("<head><title>First</title><title>Second</title></head>");
        assert_eq!(title(&doc).as_deref(), Some("First"));
        assert_eq!(title(&Html::parse_document("<p>no title</p>")), None);
    }

    #[test]
    fn test_description_name_is_case_insensitive() {
        let doc = Html::parse_document(r#"<meta name="Description" content="  About us  ">"#);
        assert_eq!(description(&doc).as_deref(), Some("About us"));
    }

    #[test]
    fn test_description_empty_content_is_none() {
        let doc = Html::parse_document(r#"<meta name="description" content="   "><meta name="description" content="late">"#);
        assert_eq!(description(&doc), None);
    }

    #[test]
    fn test_robots_tokens() {
        let doc = Html::parse_document(
            r#"<meta name="robots" content="NoIndex, nofollow,,"><meta name="ROBOTS" content="noarchive, noindex">"#,
        );
        let tokens: Vec<_> = robots(&doc).into_iter().collect();
        assert_eq!(tokens, vec!["noarchive", "nofollow", "noindex"]);
    }

    #[test]
    fn test_robots_absent() {
        assert!(robots(&Html::parse_document("<p>x</p>")).is_empty());
    }

    #[test]
    fn test_canonical_relative() {
        let doc = Html::parse_document(r#"<link rel="stylesheet" href="/a.css"><link rel="Canonical" href="/blog/post">"#);
        assert_eq!(canonical(&doc, &page()), Ok(Some("https://example.com/blog/post".to_string())));
    }

    #[test]
    fn test_canonical_invalid() {
        let doc = Html::parse_document(r#"<link rel="canonical" href="https://">"#);
        assert_eq!(canonical(&doc, &page()), Err(Diagnostic::InvalidCanonical { href: "https://".into() }));

        let doc = Html::parse_document(r#"<link rel="canonical">"#);
        assert_eq!(canonical(&doc, &page()), Err(Diagnostic::InvalidCanonical { href: String::new() }));
    }

    #[test]
    fn test_canonical_absent() {
        assert_eq!(canonical(&Html::parse_document("<p>x</p>"), &page()), Ok(None));
    }

    #[test]
    fn test_base_url() {
        let doc = Html::parse_document(r#"<base href="/static/">"#);
        assert_eq!(base_url(&doc, &page()).as_str(), "https://example.com/static/");
        assert_eq!(base_url(&Html::parse_document("<p>x</p>"), &page()), page());
    }
}
