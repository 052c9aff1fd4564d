use serde::{Deserialize, Serialize};

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Tag catalog entry. Tags live in their own table and are associated to
/// media through the `media_tags` join table; this layer references them by
/// id only and never mutates the catalog itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Tag {
    pub id: i32,
    pub name: String,
}
