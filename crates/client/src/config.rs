//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `DESKLY_STOREFRONT_URL` - Storefront API base URL (default: http://127.0.0.1:3000)
//! - `DESKLY_ADMIN_URL` - Backoffice API base URL (default: http://127.0.0.1:3001)
//! - `DESKLY_POSTAL_URL` - ViaCEP-compatible lookup service (default: https://viacep.com.br)
//! - `DESKLY_REQUEST_TIMEOUT_SECS` - Timeout for regular requests (default: 15)
//! - `DESKLY_SUBMIT_TIMEOUT_SECS` - Timeout for order submission (default: 30)

use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where the servers live and how long to wait for them.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub storefront_url: Url,
    pub admin_url: Url,
    pub postal_url: Url,
    pub request_timeout: Duration,
    /// Upper bound on an order submission. Expiry leaves checkout in PAYMENT.
    pub submit_timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            storefront_url: get_url("DESKLY_STOREFRONT_URL", "http://127.0.0.1:3000")?,
            admin_url: get_url("DESKLY_ADMIN_URL", "http://127.0.0.1:3001")?,
            postal_url: get_url("DESKLY_POSTAL_URL", "https://viacep.com.br")?,
            request_timeout: get_secs("DESKLY_REQUEST_TIMEOUT_SECS", 15)?,
            submit_timeout: get_secs("DESKLY_SUBMIT_TIMEOUT_SECS", 30)?,
        })
    }

    /// Configuration with explicit endpoints and default timeouts.
    #[must_use]
    pub const fn with_urls(storefront_url: Url, admin_url: Url, postal_url: Url) -> Self {
        Self {
            storefront_url,
            admin_url,
            postal_url,
            request_timeout: Duration::from_secs(15),
            submit_timeout: Duration::from_secs(30),
        }
    }
}

fn get_url(key: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn get_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}
