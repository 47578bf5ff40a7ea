//! Runtime configuration
//!
//! Values come from the process environment (optionally seeded from a
//! `.env` file by `dotenvy` in `main`). Every setting has a default except
//! the admin credentials, which are only needed to bootstrap the dashboard
//! account.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SESSION_TTL_HOURS: i64 = 8;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {name}")]
    Invalid { name: &'static str, value: String },
}

/// Centralized application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Path of the redb file
    pub database_url: String,
    /// Directory uploaded images are written to and served from
    pub upload_dir: PathBuf,
    /// Prefix used to build the URL returned by the upload endpoint
    pub public_base_url: String,
    pub session_ttl_hours: i64,
    pub max_upload_bytes: usize,
    /// Adds the `Secure` attribute to the session cookie
    pub cookie_secure: bool,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            database_url: "data.db".into(),
            upload_dir: PathBuf::from("uploads"),
            public_base_url: format!("http://localhost:{}", DEFAULT_PORT),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cookie_secure: false,
            admin_username: None,
            admin_password: None,
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<bool, ConfigError> {
    match lookup(name) {
        None => Ok(false),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `HOST` (default `0.0.0.0`), `PORT` (default 8080)
    /// - `DATABASE_URL` - redb file path (default `data.db`)
    /// - `UPLOAD_DIR` (default `uploads`)
    /// - `PUBLIC_BASE_URL` (default `http://localhost:{PORT}`)
    /// - `SESSION_TTL_HOURS` (default 8)
    /// - `MAX_UPLOAD_BYTES` (default 5 MiB)
    /// - `COOKIE_SECURE` (default false)
    /// - `ADMIN_USERNAME`, `ADMIN_PASSWORD` - bootstrap dashboard account
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`AppConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let session_ttl_hours = parse_or(&lookup, "SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)?;
        if session_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                name: "SESSION_TTL_HOURS",
                value: session_ttl_hours.to_string(),
            });
        }

        Ok(Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port,
            database_url: non_empty("DATABASE_URL").unwrap_or(defaults.database_url),
            upload_dir: non_empty("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            public_base_url: non_empty("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            session_ttl_hours,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            cookie_secure: parse_flag(&lookup, "COOKIE_SECURE")?,
            admin_username: non_empty("ADMIN_USERNAME"),
            admin_password: non_empty("ADMIN_PASSWORD"),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Admin credentials when both halves are configured.
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_username, &self.admin_password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }
}
