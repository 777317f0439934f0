//! mediarr - Media discovery core
//!
//! Finds new movies and shows in public catalogs (Trakt, TMDB, TVMaze),
//! normalizes them into one canonical record and filters them before they
//! reach a library manager.
//!
//! # Architecture
//!
//! A search flows through a fixed set of stages:
//! - Providers page through a catalog, sharing named rate limiters
//! - Every request goes through one transport with timeout and retry
//! - Candidates are deduplicated, checked against the library and ignore
//!   rules, and optionally id-validated against a SQLite-backed cache
//! - The survivors are returned keyed by canonical id
//!
//! # Modules
//!
//! - `domain`: Data structures (MediaItem, SearchQuery)
//! - `web`: Rate limiters, retry policy, HTTP transport
//! - `cache`: SQLite validation cache
//! - `filter`: Ignore/accept rule expressions
//! - `provider`: Catalog providers and the pagination loop
//! - `media`: Id validation and result helpers
//! - `library`: Library-manager contract
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Popular shows on Trakt, at most 50
//! mediarr shows trakt --search-type popular --limit 50
//!
//! # Upcoming movies in the UK
//! mediarr movies tmdb --search-type upcoming --country GB
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod filter;
pub mod library;
pub mod media;
pub mod provider;
pub mod web;

// Re-export main types at crate root for convenience
pub use cache::{CacheError, Database, ValidationCache};
pub use domain::{MediaItem, MediaType, SearchQuery, SearchType};
pub use filter::{ExpressionError, FilterRules, Rule};
pub use provider::{Provider, ProviderError, ProviderKind, SearchResults};
pub use web::{HttpClient, RateLimiter, RateLimiterRegistry, RetryPolicy, WebError};
