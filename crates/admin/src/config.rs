//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_BASE_URL` - Public URL for the backoffice API
//! - `ADMIN_SESSION_SECRET` - Session cookie signing key (min 64 bytes, high entropy)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_STRICT_STATUS_TRANSITIONS` - `true` (or `strict`) to reject status
//!   changes outside the fulfillment graph (default: any change allowed)
//! - `LOG_FORMAT`, `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE` - as for the storefront

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use deskly_core::TransitionPolicy;
use deskly_core::config::{self as env, SentryConfig};
use secrecy::{ExposeSecret, SecretString};
use tower_sessions::cookie::Key;

pub use deskly_core::config::{ConfigError, LogFormat};

const SESSION_SECRET_VAR: &str = "ADMIN_SESSION_SECRET";

#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    /// Signs the backoffice session cookie
    pub session_secret: SecretString,
    /// Which status changes operators may make
    pub transition_policy: TransitionPolicy,
    pub log_format: LogFormat,
    pub sentry: SentryConfig,
}

impl AdminConfig {
    /// Load configuration from the environment, reading `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the session secret is weak.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: env::database_url("ADMIN_DATABASE_URL")?,
            host: env::parse_env("ADMIN_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?,
            port: env::parse_env("ADMIN_PORT", 3001)?,
            base_url: env::required_url("ADMIN_BASE_URL")?,
            session_secret: env::session_secret(SESSION_SECRET_VAR)?,
            transition_policy: env::parse_env(
                "ADMIN_STRICT_STATUS_TRANSITIONS",
                TransitionPolicy::Permissive,
            )?,
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

    /// # Errors
    ///
    /// Returns `ConfigError::InsecureSecret` if the secret is too short to
    /// serve as a key.
    pub fn session_key(&self) -> Result<Key, ConfigError> {
        Key::try_from(self.session_secret.expose_secret().as_bytes())
            .map_err(|e| ConfigError::InsecureSecret(SESSION_SECRET_VAR.to_string(), e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "hG5tR8wQ1zX4cV7bN0mK3jL6pY9sD2fA5eU8iO1uT4rE7wQ0zX3cV6bN9mK2jL5p";

    #[test]
    fn test_socket_addr() {
        let addr = test_config("http://localhost:3001").socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_is_secure_follows_base_url_scheme() {
        assert!(!test_config("http://localhost:3001").is_secure());
        assert!(test_config("https://backoffice.deskly.com.br").is_secure());
    }

    #[test]
    fn test_session_key_is_usable() {
        let key = test_config("http://localhost:3001").session_key().unwrap();
        assert_eq!(key.master(), Key::try_from(SECRET.as_bytes()).unwrap().master());
    }

    #[test]
    fn test_config_debug_redacts_secrets() {
        let debug_output = format!("{:?}", test_config("http://localhost:3001"));
        assert!(!debug_output.contains("postgres://localhost/test"));
        assert!(!debug_output.contains(SECRET));
    }

    #[test]
    fn test_default_config_is_permissive() {
        assert_eq!(
            test_config("http://localhost:3001").transition_policy,
            TransitionPolicy::Permissive
        );
    }

    fn test_config(base_url: &str) -> AdminConfig {
        AdminConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: base_url.to_string(),
            session_secret: SecretString::from(SECRET),
            transition_policy: TransitionPolicy::Permissive,
            log_format: LogFormat::Pretty,
            sentry: SentryConfig::default(),
        }
    }
}
