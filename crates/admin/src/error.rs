//! Unified error handling for admin.
//!
//! Every error leaves as a JSON [`ErrorBody`]; server-class errors are
//! captured to Sentry first.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use deskly_core::{ErrorBody, TransitionError};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AdminAuthError, LifecycleError};

/// Application-level error type for the backoffice.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AdminAuthError),

    /// The status change is not allowed from the order's current status.
    #[error("Transition refused: {0}")]
    Transition(#[from] TransitionError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Internal(_)
                | Self::Database(
                    RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
                )
                | Self::Auth(AdminAuthError::Repository(_) | AdminAuthError::PasswordHash)
        )
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_))
            | Self::Auth(AdminAuthError::UserAlreadyExists)
            | Self::Transition(_) => StatusCode::CONFLICT,
            Self::Auth(AdminAuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            Self::Auth(AdminAuthError::InvalidEmail(_) | AdminAuthError::WeakPassword(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Auth(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
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
                Self::Auth(AdminAuthError::InvalidCredentials) => "Invalid credentials".to_string(),
                Self::Transition(err) => err.to_string(),
                Self::NotFound(msg) | Self::BadRequest(msg) => msg.clone(),
                _ => self.to_string(),
            }
        };

        let body = ErrorBody::new(status.as_u16(), error, message);
        match self {
            Self::Transition(_) => body.with_field_error("status", self.to_string()),
            _ => body,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::OrderNotFound(_) => Self::NotFound(err.to_string()),
            LifecycleError::Transition(e) => e.into(),
            LifecycleError::Repository(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an operator.
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
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use deskly_core::{OrderId, OrderStatus};

    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 123".to_string());
        assert_eq!(err.to_string(), "Not found: order 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Auth(AdminAuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_lifecycle_errors() {
        let err = AppError::from(LifecycleError::OrderNotFound(OrderId::new(9)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = AppError::from(LifecycleError::Transition(TransitionError::Terminal {
            from: OrderStatus::Delivered,
        }));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        let body = err.body();
        assert_eq!(body.status, 409);
        assert!(body.message.contains("ENTREGUE"));
        assert!(body.errors.unwrap().contains_key("status"));
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let body = AppError::Database(RepositoryError::DataCorruption("bad enum".into())).body();
        assert_eq!(body.status, 500);
        assert_eq!(body.message, "Internal server error");
    }
}
