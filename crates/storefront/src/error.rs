//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error leaves as a JSON [`ErrorBody`] so the client can classify it
//! by status and show per-field messages.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use deskly_core::{AddressError, ErrorBody, PaymentError, PricingError};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// A single request field is invalid.
    #[error("Invalid {field}: {message}")]
    InvalidField { field: String, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the resource belongs to someone else.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request conflicts with the current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error is our fault rather than the caller's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Internal(_)
                | Self::Database(
                    RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
                )
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
        )
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::MissingField(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::InvalidField { .. } | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let status = self.status();
        let error = status.canonical_reason().unwrap_or("Error");

        // Don't expose internal error details to clients
        let message = if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            match self {
                Self::Database(RepositoryError::NotFound) => "Resource not found".to_string(),
                Self::Database(RepositoryError::Conflict(msg))
                | Self::NotFound(msg)
                | Self::Unauthorized(msg)
                | Self::Forbidden(msg)
                | Self::Conflict(msg)
                | Self::BadRequest(msg) => msg.clone(),
                Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_string(),
                Self::Auth(AuthError::UserAlreadyExists) => {
                    "An account with this email already exists".to_string()
                }
                Self::Auth(AuthError::WeakPassword(msg)) => msg.clone(),
                Self::Auth(AuthError::InvalidEmail(_)) => "Invalid email address".to_string(),
                Self::Auth(err @ AuthError::MissingField(_)) => err.to_string(),
                Self::InvalidField { message, .. } => message.clone(),
                Self::RateLimited => "Too many requests".to_string(),
                _ => self.to_string(),
            }
        };

        let body = ErrorBody::new(status.as_u16(), error, message);
        match self {
            Self::InvalidField { field, message } => body.with_field_error(field, message),
            Self::Auth(AuthError::InvalidEmail(_)) => {
                body.with_field_error("email", "Invalid email address")
            }
            Self::Auth(AuthError::WeakPassword(msg)) => body.with_field_error("password", msg),
            Self::Auth(err @ AuthError::MissingField(field)) => {
                body.with_field_error(*field, err.to_string())
            }
            _ => body,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        Self::invalid_field(err.field(), err.to_string())
    }
}

impl From<AddressError> for AppError {
    fn from(err: AddressError) -> Self {
        match err.field() {
            Some(field) => Self::invalid_field(field, err.to_string()),
            None => Self::NotFound(err.to_string()),
        }
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        let field = match err {
            PricingError::EmptyOrder | PricingError::ZeroQuantity(_) | PricingError::Overflow => {
                "items"
            }
            PricingError::NegativeShipping | PricingError::ShippingTooLarge => "shippingValue",
            PricingError::NegativePrice(_) => return Self::Internal(err.to_string()),
        };
        Self::invalid_field(field, err.to_string())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order submitted", Some(&[("order_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
