//! Configuration module for scrape runs
//!
//! This module provides the `ScrapeConfig` struct, its type-safe builder and
//! a JSON loader, all validated the same way.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::{ScrapeConfigBuilder, WithStartUrl};
pub use types::ScrapeConfig;
