//! Configuration module
//!
//! Environment-driven configuration for the data-access layer: the database
//! connection and the base URL that storage-relative media paths are resolved
//! against at serialization time.

use std::env;

use anyhow::{Context, Result};
use url::Url;

const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    /// Base URL for serving media files (`MEDIA_URL`). Always ends with `/`.
    pub media_url: Url,
    pub db_max_connections: u32,
    pub environment: String,
}

impl Config {
    /// Load configuration from the environment (and `.env` when present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let media_url =
            parse_media_url(&env::var("MEDIA_URL").context("MEDIA_URL must be set")?)?;
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let environment =
            env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            database_url,
            media_url,
            db_max_connections,
            environment,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

/// Parse and normalize the base media URL.
///
/// A trailing slash is enforced: RFC 3986 resolution against a base without
/// one would replace the last path segment instead of appending to it.
pub fn parse_media_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("invalid MEDIA_URL: {raw}"))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_url_keeps_trailing_slash() {
        let url = parse_media_url("https://media.example/").unwrap();
        assert_eq!(url.as_str(), "https://media.example/");
    }

    #[test]
    fn test_parse_media_url_appends_trailing_slash() {
        let url = parse_media_url("https://media.example/assets").unwrap();
        assert_eq!(url.as_str(), "https://media.example/assets/");

        let joined = url.join("a/b.png").unwrap();
        assert_eq!(joined.as_str(), "https://media.example/assets/a/b.png");
    }

    #[test]
    fn test_parse_media_url_rejects_garbage() {
        assert!(parse_media_url("not a url").is_err());
    }

    // The only test that touches process environment; everything else reads
    // config through explicit values.
    #[test]
    fn test_from_env() {
        env::set_var("DATABASE_URL", "postgres://localhost/mediabase_test");
        env::set_var("MEDIA_URL", "https://media.example");
        env::remove_var("DB_MAX_CONNECTIONS");
        env::remove_var("ENVIRONMENT");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database_url, "postgres://localhost/mediabase_test");
        assert_eq!(config.media_url.as_str(), "https://media.example/");
        assert_eq!(config.db_max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.environment, "development");

        env::remove_var("MEDIA_URL");
        assert!(Config::from_env().is_err());
    }

    #[test]
    fn test_is_production() {
        let config = Config {
            database_url: "postgres://localhost/mediabase".to_string(),
            media_url: parse_media_url("https://media.example/").unwrap(),
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            environment: "Production".to_string(),
        };
        assert!(config.is_production());

        let config = Config {
            environment: "development".to_string(),
            ..config
        };
        assert!(!config.is_production());
    }
}
