//! Client code for seo-lens.
//!
//! This crate provides the page renderers, the SEO extractor and the
//! analyzer service the server calls into.

pub mod analyzer;
pub mod extract;
pub mod fetch;
pub mod render;

pub use analyzer::{Analysis, Analyzer, AnalyzerSettings};
pub use extract::{ExtractOptions, analyze_html, extract, extract_links};
pub use fetch::{FetchConfig, HttpRenderer};
#[cfg(feature = "render")]
pub use render::HeadlessRenderer;
pub use render::{RenderOptions, RenderedPage, Renderer};
