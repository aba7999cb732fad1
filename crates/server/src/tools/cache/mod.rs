//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and resetting the in-memory
//! report cache.

pub mod clear;
pub mod invalidate;
pub mod stats;

pub use clear::{CacheClearOutput, clear_impl};
pub use invalidate::{CacheInvalidateOutput, CacheInvalidateParams, invalidate_impl};
pub use stats::{CacheStatsOutput, stats_impl};
