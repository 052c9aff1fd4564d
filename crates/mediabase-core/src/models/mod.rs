//! Domain models

pub mod media;
pub mod tag;

pub use media::{MediaRecord, MediaResponse, MediaRow, MediaUpdate, NewMedia};
pub use tag::Tag;
