//! Error types module
//!
//! All errors are unified under the `AppError` enum: schema violations on the
//! write path, missing records, and storage faults. This layer performs no
//! retries and no local recovery; every error surfaces to the caller
//! unchanged.
//!
//! The `Storage` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature so the core crate can be built without a database driver.

use std::fmt;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// A single schema violation: the offending field and the constraint it broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub constraint: String,
}

/// Input violates the write schema. Raised before any storage write; always
/// recoverable by the caller correcting the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.push(field, constraint);
        err
    }

    /// Wrap a deserialization failure (wrong type, missing required field,
    /// unknown field) from the strict input schema.
    pub fn from_serde(err: serde_json::Error) -> Self {
        Self::single("input", err.to_string())
    }

    pub fn push(&mut self, field: impl Into<String>, constraint: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            constraint: constraint.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Ok when no violations were recorded, Err(self) otherwise.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema validation failed: ")?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} {}", v.field, v.constraint)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("not found: {0}")]
    NotFound(String),

    #[cfg(feature = "sqlx")]
    #[error("storage error: {0}")]
    Storage(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::RowNotFound => AppError::NotFound("record not found".to_string()),
            other => AppError::Storage(other),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_collects_violations() {
        let mut err = ValidationError::new();
        assert!(err.is_empty());
        err.push("name", "is required");
        err.push("width", "must be >= 0");
        assert_eq!(err.violations().len(), 2);
        assert_eq!(err.violations()[0].field, "name");

        let msg = err.to_string();
        assert!(msg.contains("name is required"));
        assert!(msg.contains("width must be >= 0"));
    }

    #[test]
    fn test_empty_validation_error_is_ok() {
        assert!(ValidationError::new().into_result().is_ok());
        assert!(ValidationError::single("file", "is required")
            .into_result()
            .is_err());
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));

        let err: AppError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
