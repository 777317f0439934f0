//! Domain types shared by every stage of the pipeline.
//!
//! - MediaItem: the canonical media record
//! - SearchType / SearchQuery: what a provider is asked for

pub mod media_item;
pub mod search;

// Re-export commonly used types
pub use media_item::{IdKind, MediaItem, MediaType};
pub use search::{ParseSearchTypeError, SearchQuery, SearchType};
