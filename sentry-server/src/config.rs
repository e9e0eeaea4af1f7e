//! Server configuration loaded from the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default upload size limit (500 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Directory holding uploaded models.
    pub upload_dir: PathBuf,
    /// Largest accepted multipart upload, in bytes.
    pub max_upload_bytes: usize,
    /// Origins allowed by CORS.
    pub ui_origins: Vec<String>,
    /// Fixed simulation seed; fresh entropy per request when absent.
    pub random_seed: Option<u64>,
}

/// A missing or malformed environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset.
    Missing(&'static str),
    /// A variable failed to parse.
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::Invalid { key, value } => write!(f, "{key} has invalid value {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Build config from process environment variables.
    #[cfg_attr(test, allow(dead_code))]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let origins = lookup("SENTRY_UI_ORIGINS")
            .unwrap_or_else(|| "http://127.0.0.1:3000,http://localhost:3000".to_string());
        let ui_origins = origins
            .split(',')
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            host: lookup("SENTRY_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "SENTRY_PORT", 5000)?,
            database_url: lookup("DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            upload_dir: lookup("SENTRY_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static/uploads")),
            max_upload_bytes: parse_or(
                &lookup,
                "SENTRY_MAX_UPLOAD_BYTES",
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            ui_origins,
            random_seed: lookup("SENTRY_RANDOM_SEED")
                .map(|raw| parse_value("SENTRY_RANDOM_SEED", &raw))
                .transpose()?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}
