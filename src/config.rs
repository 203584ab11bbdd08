//! Application configuration.
//!
//! Every setting is resolved with the priority config.toml > environment
//! (including `.env`) > default.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::services::signing;

// ==================== Defaults ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 3000;

/// Public prefix of signed media links
pub const MEDIA_BASE_URL: &str = "/media";

/// Default playback ticket lifetime (2 hours)
pub const TICKET_TTL_SECS: i64 = 2 * 60 * 60;

/// Longest lifetime a caller may request (12 hours)
pub const TICKET_MAX_TTL_SECS: i64 = 12 * 60 * 60;

/// Upper bound accepted for TICKET_MAX_TTL_SECS (7 days)
pub const TICKET_TTL_CEILING_SECS: i64 = 7 * 24 * 60 * 60;

/// Login session lifetime (1 week)
pub const SESSION_EXPIRY_HOURS: i64 = 24 * 7;

// ==================== config.toml ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    server: Option<ServerConfig>,
    database: Option<DatabaseConfig>,
    media: Option<MediaConfig>,
    session: Option<SessionConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerConfig {
    addr: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaConfig {
    dir: Option<String>,
    base_url: Option<String>,
    signing_secret: Option<String>,
    ticket_ttl_secs: Option<i64>,
    ticket_max_ttl_secs: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionConfig {
    expiry_hours: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not parse {path}: {source}")]
    File {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("{key} has invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0}")]
    Inconsistent(String),
}

// ==================== Settings ====================

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub media_dir: PathBuf,
    pub media_base_url: String,
    pub signing_secret: String,
    pub ticket_ttl_secs: i64,
    pub ticket_max_ttl_secs: i64,
    pub session_expiry_hours: i64,
}

/// Pick the file value, else parse the env value, else the default
fn resolve<T: std::str::FromStr>(
    key: &'static str,
    from_file: Option<T>,
    env: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    if let Some(value) = from_file {
        return Ok(value);
    }
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

impl Settings {
    /// Load settings from `config.toml` (if present) and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let file = Self::read_file(Path::new("config.toml"))?;
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Parse a config file, None if it doesn't exist
    pub fn read_file(path: &Path) -> Result<Option<FileConfig>, ConfigError> {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Ok(None);
        };
        let config = toml::from_str::<FileConfig>(&contents).map_err(|source| ConfigError::File {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!("Using configuration from {}", path.display());
        Ok(Some(config))
    }

    pub fn from_sources(
        file: Option<FileConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();
        let server = file.server.unwrap_or_default();
        let database = file.database.unwrap_or_default();
        let media = file.media.unwrap_or_default();
        let session = file.session.unwrap_or_default();

        let settings = Self {
            server_addr: resolve("SERVER_ADDR", server.addr, &env, SERVER_ADDR.to_string())?,
            port: resolve("PORT", server.port, &env, SERVER_PORT)?,
            database_path: resolve(
                "DATABASE_PATH",
                database.path.map(PathBuf::from),
                &env,
                PathBuf::from(paths::app_db_path()),
            )?,
            media_dir: resolve(
                "MEDIA_DIR",
                media.dir.map(PathBuf::from),
                &env,
                PathBuf::from(paths::media_dir()),
            )?,
            media_base_url: resolve(
                "MEDIA_BASE_URL",
                media.base_url,
                &env,
                MEDIA_BASE_URL.to_string(),
            )?,
            signing_secret: match media.signing_secret.or_else(|| env("MEDIA_SIGNING_SECRET")) {
                Some(secret) if !secret.trim().is_empty() => secret,
                _ => {
                    tracing::warn!(
                        "MEDIA_SIGNING_SECRET is not set; using a random secret, issued links will not survive a restart"
                    );
                    signing::random_secret()
                }
            },
            ticket_ttl_secs: resolve("TICKET_TTL_SECS", media.ticket_ttl_secs, &env, TICKET_TTL_SECS)?,
            ticket_max_ttl_secs: resolve(
                "TICKET_MAX_TTL_SECS",
                media.ticket_max_ttl_secs,
                &env,
                TICKET_MAX_TTL_SECS,
            )?,
            session_expiry_hours: resolve(
                "SESSION_EXPIRY_HOURS",
                session.expiry_hours,
                &env,
                SESSION_EXPIRY_HOURS,
            )?,
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ticket_ttl_secs <= 0 || self.ticket_max_ttl_secs <= 0 {
            return Err(ConfigError::Inconsistent(
                "ticket lifetimes must be positive".to_string(),
            ));
        }
        if self.ticket_max_ttl_secs > TICKET_TTL_CEILING_SECS {
            return Err(ConfigError::InvalidValue {
                key: "TICKET_MAX_TTL_SECS",
                value: self.ticket_max_ttl_secs.to_string(),
            });
        }
        if self.ticket_ttl_secs > self.ticket_max_ttl_secs {
            return Err(ConfigError::Inconsistent(format!(
                "TICKET_TTL_SECS ({}) exceeds TICKET_MAX_TTL_SECS ({})",
                self.ticket_ttl_secs, self.ticket_max_ttl_secs
            )));
        }
        if self.session_expiry_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "SESSION_EXPIRY_HOURS",
                value: self.session_expiry_hours.to_string(),
            });
        }
        Ok(())
    }

    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_addr, self.port)
    }
}
