//! Database repositories for the data access layer
//
// Media records and their tag associations
pub mod media;
//
// Transaction utilities
pub mod transaction;

pub use media::{MediaRepository, TagDiff};
