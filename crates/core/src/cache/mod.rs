//! In-memory result cache for SEO reports.
//!
//! This module provides a bounded TTL cache keyed by canonical analysis
//! requests. It supports:
//!
//! - Canonical keys (sorted query, lowercased host) hashed with SHA-256
//! - Single-flight deduplication of concurrent misses for the same key
//! - Lazy expiry on read plus an optional background sweep
//! - Capacity eviction: oldest expired entry first, otherwise least recently used

pub mod key;
mod state;
pub mod stats;
pub mod store;

pub use key::{AnalysisKey, AnalysisOptions, canonicalize};
pub use stats::CacheStats;
pub use store::{Origin, Resolved, ResultCache};
