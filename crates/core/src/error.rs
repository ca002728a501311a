//! Error classes shared by the servers and the client.
//!
//! Every failure that reaches the checkout state machine or an operator is
//! first reduced to an [`ErrorClass`]. Raw transport errors never cross that
//! boundary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AddressError, PaymentError};

/// Coarse classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Bad input. Blocks the current step only.
    Validation,
    /// Session missing or expired.
    Auth,
    /// Authenticated but not allowed.
    Forbidden,
    NotFound,
    Conflict,
    Server,
    /// No usable response (connection failure, timeout).
    Network,
}

impl ErrorClass {
    /// Classify an HTTP status code. Only meaningful for non-success codes;
    /// anything unexpected is treated as a server failure.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Auth,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            408 => Self::Network,
            409 => Self::Conflict,
            429 => Self::Server,
            400..=499 => Self::Validation,
            _ => Self::Server,
        }
    }

    /// Whether the same request may be retried without changing input.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Server | Self::Network)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Server => "server",
            Self::Network => "network",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON error body returned by both servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorBody {
    #[must_use]
    pub fn new(status: u16, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
            path: None,
            errors: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_field_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), message.into());
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// A classified failure, as seen by the client and the checkout machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{class} error: {message}")]
pub struct ApiError {
    pub class: ErrorClass,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    pub message: String,
    /// Per-field messages keyed by wire field name.
    pub field_errors: BTreeMap<String, String>,
}

impl ApiError {
    #[must_use]
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            status: None,
            message: message.into(),
            field_errors: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Network, message)
    }

    #[must_use]
    pub fn timeout() -> Self {
        Self::network("request timed out")
    }

    #[must_use]
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut err = Self::new(ErrorClass::Validation, message.clone());
        err.field_errors.insert(field.to_owned(), message);
        err
    }

    /// Build an error from a non-success response.
    ///
    /// The body is parsed as an [`ErrorBody`] when possible; otherwise the
    /// raw text (or a generic message) is kept.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let class = ErrorClass::from_status(status);
        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) => Self {
                class,
                status: Some(status),
                message: parsed.message,
                field_errors: parsed.errors.unwrap_or_default(),
            },
            Err(_) => {
                let text = String::from_utf8_lossy(body).trim().to_owned();
                let message = if text.is_empty() {
                    format!("request failed with status {status}")
                } else {
                    text
                };
                Self {
                    class,
                    status: Some(status),
                    message,
                    field_errors: BTreeMap::new(),
                }
            }
        }
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.class.is_retryable()
    }

    #[must_use]
    pub fn is(&self, class: ErrorClass) -> bool {
        self.class == class
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self::validation(err.field(), err.to_string())
    }
}

impl From<AddressError> for ApiError {
    fn from(err: AddressError) -> Self {
        match err.field() {
            Some(field) => Self::validation(field, err.to_string()),
            None => Self::new(ErrorClass::NotFound, err.to_string()),
        }
    }
}
