//! Admin authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during operator authentication.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] deskly_core::EmailError),

    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Operator already exists.
    #[error("backoffice user already exists")]
    UserAlreadyExists,

    /// Password too weak.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
