//! Heading outline and visible word count.

use std::sync::OnceLock;

use scraper::{Html, Selector};
use seolens_core::Heading;

use super::{collapse_whitespace, selector};

static HEADINGS: OnceLock<Selector> = OnceLock::new();
static BODY: OnceLock<Selector> = OnceLock::new();

/// Elements whose text never counts as visible.
const HIDDEN: [&str; 4] = ["script", "style", "noscript", "template"];

/// `h1` through `h6` in document order.
pub fn headings(document: &Html) -> Vec<Heading> {
    document
        .select(selector(&HEADINGS, "h1, h2, h3, h4, h5, h6"))
        .filter_map(|element| {
            let level = element.value().name().strip_prefix('h')?.parse::<u8>().ok()?;
            Some(Heading { level, text: collapse_whitespace(element.text()) })
        })
        .collect()
}

/// Whitespace-separated tokens across the visible text of `<body>`.
///
/// Adjacent text nodes are counted separately, so `foo<b>bar</b>` is two words.
pub fn word_count(document: &Html) -> usize {
    let Some(body) = document.select(selector(&BODY, "body")).next() else {
        return 0;
    };

    body.descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| {
            !node
                .ancestors()
                .any(|a| a.value().as_element().is_some_and(|e| HIDDEN.contains(&e.name())))
        })
        .map(|(_, text)| text.split_whitespace().count())
        .sum()
}
