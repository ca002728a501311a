//! Environment helpers shared by the storefront and admin servers.
//!
//! Each server owns its variable names and its config struct; this module
//! only reads, parses and vets values. Session secrets double as the
//! cookie signing key, so they must be at least [`MIN_SESSION_SECRET_LENGTH`]
//! bytes, look random, and not resemble a placeholder.

use std::collections::HashMap;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Bytes needed for a signing key.
pub const MIN_SESSION_SECRET_LENGTH: usize = 64;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Case-insensitive fragments that give a copied sample value away.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Log line format, from `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_value(optional_env("LOG_FORMAT").as_deref())
    }
}

/// Sentry settings read from `SENTRY_*`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    /// Error sample rate, `0.0..=1.0`.
    pub sample_rate: f32,
    /// Transaction sample rate, `0.0..=1.0`.
    pub traces_sample_rate: f32,
}

impl SentryConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for a rate outside `0.0..=1.0`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: optional_env("SENTRY_DSN"),
            environment: optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: sample_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            traces_sample_rate: sample_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }
}

/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` when `key` is unset.
pub fn required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

#[must_use]
pub fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse `key`, or `default` when unset.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` when the value does not parse.
pub fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// A URL that must parse, kept as text.
///
/// # Errors
///
/// Returns `ConfigError` when `key` is unset or not a URL.
pub fn required_url(key: &str) -> Result<String, ConfigError> {
    let value = required_env(key)?;
    url::Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(value)
}

/// `primary`, falling back to the `DATABASE_URL` a platform attach sets.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` naming `primary` when neither is set.
pub fn database_url(primary: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary.to_string()))
}

fn sample_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let rate = parse_env(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("{rate} is outside 0.0..=1.0"),
        ))
    }
}

/// Read and vet a session secret.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` if the value is short, looks like a
/// placeholder, or has low entropy.
pub fn session_secret(key: &str) -> Result<SecretString, ConfigError> {
    let secret = SecretString::from(required_env(key)?);
    check_session_secret(&secret, key)?;
    Ok(secret)
}

/// # Errors
///
/// See [`session_secret`].
pub fn check_session_secret(secret: &SecretString, key: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    let insecure = |reason: String| Err(ConfigError::InsecureSecret(key.to_string(), reason));

    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return insecure(format!(
            "must be at least {MIN_SESSION_SECRET_LENGTH} bytes (got {})",
            value.len()
        ));
    }

    let lower = value.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
        return insecure(format!("appears to be a placeholder (contains '{pattern}')"));
    }

    let entropy = shannon_entropy(value);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return insecure(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}); \
             use a randomly generated value"
        ));
    }
    Ok(())
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .values()
        .map(|&count| {
            let p = f64::from(count) / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RANDOM: &str = "q8Vz2LmR7tXw0bNc4HsJ9pKd6FgYe1UaZ3iOr5TlMv8QxWn2BoCj7EhSy4GuPk0D";

    #[test]
    fn test_entropy() {
        assert!(shannon_entropy("").abs() < f64::EPSILON);
        assert!(shannon_entropy("aaaaaaa").abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy(RANDOM) > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_random_secret_is_accepted() {
        assert_eq!(RANDOM.len(), MIN_SESSION_SECRET_LENGTH);
        assert!(check_session_secret(&SecretString::from(RANDOM), "KEY").is_ok());
    }

    #[test]
    fn test_short_secret_is_refused() {
        let secret = SecretString::from(&RANDOM[..32]);
        let err = check_session_secret(&secret, "KEY").unwrap_err();
        assert!(err.to_string().contains("at least 64 bytes"), "{err}");
    }

    #[test]
    fn test_placeholder_and_low_entropy_are_refused() {
        let placeholder = format!("changeme-{RANDOM}");
        assert!(matches!(
            check_session_secret(&SecretString::from(placeholder), "KEY"),
            Err(ConfigError::InsecureSecret(key, _)) if key == "KEY"
        ));

        let repetitive = "ab".repeat(40);
        let err = check_session_secret(&SecretString::from(repetitive), "KEY").unwrap_err();
        assert!(err.to_string().contains("entropy too low"), "{err}");
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_env_value(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some(" JSON ")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("pretty")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Pretty);
    }
}
