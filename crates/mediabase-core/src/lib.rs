//! Mediabase core library
//!
//! This crate provides the domain models, input schema validation, error
//! types, and configuration shared across mediabase components. It is pure:
//! nothing in here talks to the database.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, FieldViolation, ValidationError};
