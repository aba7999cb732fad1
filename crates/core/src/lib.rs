//! Core types and shared functionality for seo-lens.
//!
//! This crate provides:
//! - In-memory TTL result cache with single-flight deduplication
//! - The `SeoReport` data model
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod report;

pub use cache::{AnalysisKey, AnalysisOptions, CacheStats, Origin, Resolved, ResultCache};
pub use config::{AppConfig, ConfigError};
pub use error::{Error, FetchError};
pub use report::{Diagnostic, Heading, Link, SelectorCount, SeoReport};
