//! Write-path schema validation for media records.
//!
//! Every create/update runs through here before any SQL is issued; a
//! violation means no partial write ever happens. Referential integrity of
//! `project_id`/`user_id` is the database's foreign-key contract and is not
//! checked at this level.

use crate::error::ValidationError;
use crate::models::{MediaUpdate, NewMedia};

pub const MAX_NAME_LENGTH: usize = 512;
pub const MAX_FILE_LENGTH: usize = 512;
pub const MAX_THUMBNAIL_LENGTH: usize = 512;
pub const MAX_MIME_TYPE_LENGTH: usize = 128;
pub const MAX_DESCRIPTION_LENGTH: usize = 64;

/// Validate an insert payload.
pub fn validate_new_media(input: &NewMedia) -> Result<(), ValidationError> {
    let mut err = ValidationError::new();

    check_required(&mut err, "name", &input.name, MAX_NAME_LENGTH);
    check_required(&mut err, "file", &input.file, MAX_FILE_LENGTH);
    check_required(&mut err, "mimeType", &input.mime_type, MAX_MIME_TYPE_LENGTH);
    if let Some(thumbnail) = &input.thumbnail {
        check_length(&mut err, "thumbnail", thumbnail, MAX_THUMBNAIL_LENGTH);
    }
    check_length(&mut err, "description", &input.description, MAX_DESCRIPTION_LENGTH);
    check_non_negative(&mut err, "width", input.width);
    check_non_negative(&mut err, "height", input.height);

    err.into_result()
}

/// Validate a partial update payload. Only supplied fields are checked.
pub fn validate_media_update(input: &MediaUpdate) -> Result<(), ValidationError> {
    let mut err = ValidationError::new();

    if let Some(name) = &input.name {
        check_required(&mut err, "name", name, MAX_NAME_LENGTH);
    }
    if let Some(file) = &input.file {
        check_required(&mut err, "file", file, MAX_FILE_LENGTH);
    }
    if let Some(mime_type) = &input.mime_type {
        check_required(&mut err, "mimeType", mime_type, MAX_MIME_TYPE_LENGTH);
    }
    if let Some(thumbnail) = &input.thumbnail {
        check_length(&mut err, "thumbnail", thumbnail, MAX_THUMBNAIL_LENGTH);
    }
    if let Some(description) = &input.description {
        check_length(&mut err, "description", description, MAX_DESCRIPTION_LENGTH);
    }
    if let Some(width) = input.width {
        check_non_negative(&mut err, "width", width);
    }
    if let Some(height) = input.height {
        check_non_negative(&mut err, "height", height);
    }

    err.into_result()
}

fn check_required(err: &mut ValidationError, field: &str, value: &str, max: usize) {
    if value.is_empty() {
        err.push(field, "is required");
        return;
    }
    check_length(err, field, value, max);
}

fn check_length(err: &mut ValidationError, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        err.push(field, format!("must be at most {max} characters"));
    }
}

fn check_non_negative(err: &mut ValidationError, field: &str, value: i32) {
    if value < 0 {
        err.push(field, "must be >= 0");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> NewMedia {
        NewMedia {
            name: "hero shot".to_string(),
            file: "a/b.png".to_string(),
            thumbnail: None,
            mime_type: "image/png".to_string(),
            size: 2048,
            width: 800,
            height: 600,
            description: String::new(),
            project_id: 5,
            user_id: 3,
        }
    }

    #[test]
    fn test_valid_input_passes() {
        assert!(validate_new_media(&valid_input()).is_ok());
    }

    #[test]
    fn test_empty_required_fields_fail() {
        let mut input = valid_input();
        input.name = String::new();
        input.file = String::new();
        let err = validate_new_media(&input).unwrap_err();
        let fields: Vec<_> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "file"]);
    }

    #[test]
    fn test_overlong_fields_fail() {
        let mut input = valid_input();
        input.name = "x".repeat(MAX_NAME_LENGTH + 1);
        input.description = "y".repeat(MAX_DESCRIPTION_LENGTH + 1);
        let err = validate_new_media(&input).unwrap_err();
        assert_eq!(err.violations().len(), 2);
        assert!(err.to_string().contains("name"));
        assert!(err.to_string().contains("description"));
    }

    #[test]
    fn test_length_cap_is_inclusive() {
        let mut input = valid_input();
        input.name = "x".repeat(MAX_NAME_LENGTH);
        assert!(validate_new_media(&input).is_ok());
    }

    #[test]
    fn test_negative_dimensions_fail() {
        let mut input = valid_input();
        input.width = -1;
        input.height = -600;
        let err = validate_new_media(&input).unwrap_err();
        let fields: Vec<_> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["width", "height"]);
    }

    #[test]
    fn test_update_checks_only_supplied_fields() {
        let update = MediaUpdate {
            width: Some(1024),
            ..Default::default()
        };
        assert!(validate_media_update(&update).is_ok());

        let update = MediaUpdate {
            name: Some(String::new()),
            width: Some(-5),
            ..Default::default()
        };
        let err = validate_media_update(&update).unwrap_err();
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_update_empty_thumbnail_is_allowed() {
        // Empty string clears the thumbnail; the serializer treats it as absent.
        let update = MediaUpdate {
            thumbnail: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_media_update(&update).is_ok());
    }
}
