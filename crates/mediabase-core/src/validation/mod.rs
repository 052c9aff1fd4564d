//! Validation modules

pub mod media;

pub use media::{
    validate_media_update, validate_new_media, MAX_DESCRIPTION_LENGTH, MAX_FILE_LENGTH,
    MAX_MIME_TYPE_LENGTH, MAX_NAME_LENGTH, MAX_THUMBNAIL_LENGTH,
};
