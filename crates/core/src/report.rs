//! The SEO report produced by one extraction.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// SEO signals extracted from a rendered page.
///
/// Built once by the extractor and shared read-only afterwards
/// (the cache hands out `Arc<SeoReport>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SeoReport {
    /// Final URL of the analyzed document.
    pub url: String,
    /// Text of the first `<title>`, trimmed.
    pub title: Option<String>,
    /// Content of `<meta name="description">`, trimmed.
    pub meta_description: Option<String>,
    /// Lowercased tokens of every `<meta name="robots">`.
    pub robots: BTreeSet<String>,
    /// Absolute `<link rel="canonical">` target.
    pub canonical: Option<String>,
    /// Headings in document order.
    pub headings: Vec<Heading>,
    /// Anchors in document order.
    pub links: Vec<Link>,
    /// Words of visible body text (script and style content excluded).
    pub word_count: usize,
    /// Match count for the requested CSS selector, if one was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_count: Option<SelectorCount>,
    /// SEO problems found while extracting.
    pub diagnostics: Vec<Diagnostic>,
}

impl SeoReport {
    /// Count of `<h1>` headings.
    pub fn h1_count(&self) -> usize {
        self.headings.iter().filter(|h| h.level == 1).count()
    }

    pub fn has_diagnostic(&self, predicate: impl Fn(&Diagnostic) -> bool) -> bool {
        self.diagnostics.iter().any(predicate)
    }
}

/// A heading element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Heading {
    /// 1 through 6.
    pub level: u8,
    pub text: String,
}

/// An outbound anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Link {
    /// Absolute URL, or the raw attribute value when it could not be resolved.
    pub href: String,
    /// Anchor text with whitespace collapsed.
    pub text: String,
    /// Lowercased `rel` tokens.
    pub rel: Vec<String>,
    /// Set when `href` is empty or not a valid URL reference.
    pub malformed: bool,
}

impl Link {
    pub fn is_nofollow(&self) -> bool {
        self.rel.iter().any(|r| r == "nofollow")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectorCount {
    pub selector: String,
    pub count: usize,
}

/// An SEO problem recorded instead of failing the extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    TitleMissing,
    MetaDescriptionMissing,
    MissingH1,
    MultipleH1 { count: usize },
    /// `position` indexes into `SeoReport::links`.
    MalformedHref { position: usize, href: String },
    InvalidCanonical { href: String },
    InvalidSelector { selector: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> SeoReport {
        SeoReport {
            url: "https://example.com/".into(),
            title: Some("Example".into()),
            meta_description: None,
            robots: BTreeSet::from(["noindex".to_string()]),
            canonical: None,
            headings: vec![
                Heading { level: 1, text: "One".into() },
                Heading { level: 2, text: "Two".into() },
                Heading { level: 1, text: "Again".into() },
            ],
            links: vec![Link {
                href: "https://example.com/a".into(),
                text: "A".into(),
                rel: vec!["nofollow".into(), "ugc".into()],
                malformed: false,
            }],
            word_count: 12,
            selector_count: None,
            diagnostics: vec![Diagnostic::MultipleH1 { count: 2 }],
        }
    }

    #[test]
    fn test_h1_count() {
        assert_eq!(report().h1_count(), 2);
    }

    #[test]
    fn test_nofollow() {
        assert!(report().links[0].is_nofollow());
    }

    #[test]
    fn test_diagnostic_serialization() {
        let json = serde_json::to_value(Diagnostic::MalformedHref { position: 2, href: String::new() }).unwrap();
        assert_eq!(json["kind"], "malformed_href");
        assert_eq!(json["position"], 2);

        let json = serde_json::to_value(Diagnostic::TitleMissing).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "title_missing" }));
    }

    #[test]
    fn test_report_serializes_without_selector_count() {
        let json = serde_json::to_value(report()).unwrap();
        assert!(json.get("selector_count").is_none());
        assert_eq!(json["robots"], serde_json::json!(["noindex"]));
        assert!(report().has_diagnostic(|d| matches!(d, Diagnostic::MultipleH1 { .. })));
    }
}
