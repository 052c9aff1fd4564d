use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::tag::Tag;
use crate::error::ValidationError;
use crate::validation;

/// Database row for the media table. Tag associations live in `media_tags`
/// and are not part of this row.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct MediaRow {
    pub id: i32,
    pub name: String,
    pub file: String,
    pub thumbnail: Option<String>,
    pub mime_type: String,
    pub size: i64,
    pub width: i32,
    pub height: i32,
    pub description: String,
    pub project_id: i32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl MediaRow {
    /// Build a MediaRecord from this row. Tags start unloaded; an eager
    /// fetch attaches them afterwards.
    pub fn into_record(self) -> MediaRecord {
        MediaRecord {
            id: self.id,
            name: self.name,
            file: self.file,
            thumbnail: self.thumbnail,
            mime_type: self.mime_type,
            size: self.size,
            width: self.width,
            height: self.height,
            description: self.description,
            project_id: self.project_id,
            user_id: self.user_id,
            created_at: self.created_at,
            modified_at: self.modified_at,
            tags: None,
        }
    }
}

/// One uploaded asset. Belongs to exactly one project and one user; carries
/// zero or more tags through the `media_tags` join table.
///
/// `file` and `thumbnail` hold storage-relative paths; they are resolved to
/// absolute URLs only in [`MediaRecord::into_response`].
#[derive(Debug, Clone)]
pub struct MediaRecord {
    pub id: i32,
    pub name: String,
    pub file: String,
    pub thumbnail: Option<String>,
    pub mime_type: String,
    pub size: i64,
    pub width: i32,
    pub height: i32,
    pub description: String,
    pub project_id: i32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// `Some` only when tags were eagerly loaded with the record.
    pub tags: Option<Vec<Tag>>,
}

/// Insert payload for a media record.
///
/// The schema is strict: unknown fields fail deserialization. Storage assigns
/// `id`, `created_at`, and `modified_at`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewMedia {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub mime_type: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub description: String,
    pub project_id: i32,
    pub user_id: i32,
}

impl NewMedia {
    /// Deserialize an untyped payload and validate it against the write
    /// schema. Wrong types, missing required fields, and unknown extra
    /// fields all come back as a `ValidationError`.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        let input: NewMedia =
            serde_json::from_value(value).map_err(ValidationError::from_serde)?;
        validation::validate_new_media(&input)?;
        Ok(input)
    }
}

/// Partial update payload. Every non-key field is optional; omitted fields
/// keep their stored value. `modified_at` is refreshed by the storage layer.
///
/// Clearing a thumbnail is done by setting it to the empty string; the
/// output serializer treats an empty thumbnail as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MediaUpdate {
    pub name: Option<String>,
    pub file: Option<String>,
    pub thumbnail: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub description: Option<String>,
    pub project_id: Option<i32>,
    pub user_id: Option<i32>,
}

impl MediaUpdate {
    /// Deserialize an untyped payload and validate it.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        let input: MediaUpdate =
            serde_json::from_value(value).map_err(ValidationError::from_serde)?;
        validation::validate_media_update(&input)?;
        Ok(input)
    }
}

/// Externally visible form of a media record: `file` and `thumbnail` resolved
/// to absolute URLs, tags projected down to their names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaResponse {
    pub id: i32,
    pub name: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub mime_type: String,
    pub size: i64,
    pub width: i32,
    pub height: i32,
    pub description: String,
    pub project_id: i32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl MediaRecord {
    /// Shape this record for API consumers.
    ///
    /// The stored `file` and `thumbnail` values are storage-relative paths;
    /// here they are resolved against the configured base media URL. An
    /// empty or absent thumbnail stays absent: no URL is synthesized from an
    /// empty path. A loaded tag list is replaced by the tag names, in load
    /// order. Pure; storage is never touched.
    pub fn into_response(self, media_url: &Url) -> MediaResponse {
        let file = resolve_media_path(media_url, &self.file);
        let thumbnail = self
            .thumbnail
            .filter(|t| !t.is_empty())
            .map(|t| resolve_media_path(media_url, &t));
        let tags = self
            .tags
            .map(|tags| tags.into_iter().map(|tag| tag.name).collect());

        MediaResponse {
            id: self.id,
            name: self.name,
            file,
            thumbnail,
            mime_type: self.mime_type,
            size: self.size,
            width: self.width,
            height: self.height,
            description: self.description,
            project_id: self.project_id,
            user_id: self.user_id,
            created_at: self.created_at,
            modified_at: self.modified_at,
            tags,
        }
    }
}

/// Resolve a storage-relative path against the base media URL using RFC 3986
/// join semantics. Falls back to the stored path when it cannot be joined
/// (only possible with a cannot-be-a-base URL).
fn resolve_media_path(base: &Url, path: &str) -> String {
    base.join(path)
        .map(String::from)
        .unwrap_or_else(|_| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_media_url;
    use serde_json::json;

    fn test_record() -> MediaRecord {
        MediaRecord {
            id: 7,
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
            created_at: Utc::now(),
            modified_at: Utc::now(),
            tags: None,
        }
    }

    #[test]
    fn test_into_response_resolves_file_url() {
        let base = parse_media_url("https://media.example/").unwrap();
        let response = test_record().into_response(&base);
        assert_eq!(response.file, "https://media.example/a/b.png");
    }

    #[test]
    fn test_into_response_without_thumbnail() {
        let base = parse_media_url("https://media.example/").unwrap();
        let response = test_record().into_response(&base);
        assert_eq!(response.thumbnail, None);

        let serialized = serde_json::to_value(&response).unwrap();
        assert!(serialized.get("thumbnail").is_none());
        assert!(serialized.get("tags").is_none());
    }

    #[test]
    fn test_into_response_empty_thumbnail_stays_absent() {
        let base = parse_media_url("https://media.example/").unwrap();
        let mut record = test_record();
        record.thumbnail = Some(String::new());
        let response = record.into_response(&base);
        assert_eq!(response.thumbnail, None);
    }

    #[test]
    fn test_into_response_resolves_thumbnail_url() {
        let base = parse_media_url("https://media.example/").unwrap();
        let mut record = test_record();
        record.thumbnail = Some("thumbs/b.png".to_string());
        let response = record.into_response(&base);
        assert_eq!(
            response.thumbnail.as_deref(),
            Some("https://media.example/thumbs/b.png")
        );
    }

    #[test]
    fn test_into_response_projects_tag_names_in_load_order() {
        let base = parse_media_url("https://media.example/").unwrap();
        let mut record = test_record();
        record.tags = Some(vec![
            Tag {
                id: 2,
                name: "landscape".to_string(),
            },
            Tag {
                id: 1,
                name: "night".to_string(),
            },
        ]);
        let response = record.into_response(&base);
        assert_eq!(
            response.tags,
            Some(vec!["landscape".to_string(), "night".to_string()])
        );
    }

    #[test]
    fn test_into_response_keeps_empty_tag_list() {
        let base = parse_media_url("https://media.example/").unwrap();
        let mut record = test_record();
        record.tags = Some(vec![]);
        let response = record.into_response(&base);
        assert_eq!(response.tags, Some(vec![]));
    }

    #[test]
    fn test_new_media_from_value_applies_defaults() {
        let input = NewMedia::from_value(json!({
            "name": "hero shot",
            "file": "a/b.png",
            "mimeType": "image/png",
            "projectId": 5,
            "userId": 3,
        }))
        .unwrap();
        assert_eq!(input.size, 0);
        assert_eq!(input.width, 0);
        assert_eq!(input.height, 0);
        assert_eq!(input.description, "");
        assert_eq!(input.thumbnail, None);
    }

    #[test]
    fn test_new_media_rejects_unknown_field() {
        let err = NewMedia::from_value(json!({
            "name": "hero shot",
            "file": "a/b.png",
            "mimeType": "image/png",
            "projectId": 5,
            "userId": 3,
            "owner": "nobody",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn test_new_media_rejects_missing_required_field() {
        assert!(NewMedia::from_value(json!({
            "name": "hero shot",
            "mimeType": "image/png",
            "projectId": 5,
            "userId": 3,
        }))
        .is_err());
    }

    #[test]
    fn test_media_update_rejects_unknown_field() {
        assert!(MediaUpdate::from_value(json!({ "id": 9 })).is_err());
        assert!(MediaUpdate::from_value(json!({ "name": "renamed" })).is_ok());
    }
}
