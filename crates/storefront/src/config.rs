//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session cookie signing key (min 64 bytes, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `LOG_FORMAT` - `json` for JSON log lines, anything else for plain text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (e.g. production)
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0 to 1.0 (default: 0.0)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use deskly_core::config::{self as env, SentryConfig};
use secrecy::{ExposeSecret, SecretString};
use tower_sessions::cookie::Key;

pub use deskly_core::config::{ConfigError, LogFormat};

const SESSION_SECRET_VAR: &str = "STOREFRONT_SESSION_SECRET";

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Signs the session cookie, see [`Self::session_key`]
    pub session_secret: SecretString,
    pub log_format: LogFormat,
    pub sentry: SentryConfig,
}

impl StorefrontConfig {
    /// Load configuration from the environment, reading `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the session secret is weak.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: env::database_url("STOREFRONT_DATABASE_URL")?,
            host: env::parse_env("STOREFRONT_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?,
            port: env::parse_env("STOREFRONT_PORT", 3000)?,
            base_url: env::required_url("STOREFRONT_BASE_URL")?,
            session_secret: env::session_secret(SESSION_SECRET_VAR)?,
            log_format: LogFormat::from_env(),
            sentry: SentryConfig::from_env()?,
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Cookie signing key derived from the session secret.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InsecureSecret` if the secret is too short to
    /// serve as a key.
    pub fn session_key(&self) -> Result<Key, ConfigError> {
        Key::try_from(self.session_secret.expose_secret().as_bytes())
            .map_err(|e| ConfigError::InsecureSecret(SESSION_SECRET_VAR.to_string(), e.to_string()))
    }
}
