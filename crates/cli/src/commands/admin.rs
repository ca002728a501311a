//! Backoffice operator management commands.
//!
//! # Usage
//!
//! ```bash
//! ADMIN_OPERATOR_PASSWORD=... deskly-cli admin create -e ops@example.com -n "Ops" -r operator
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (or `DATABASE_URL`)
//! - `ADMIN_OPERATOR_PASSWORD` - Password for the new operator

use deskly_admin::services::{AdminAuthError, AdminAuthService};
use deskly_core::{BackofficeRole, BackofficeUser};
use secrecy::SecretString;
use thiserror::Error;

use super::database_url;

/// Errors that can occur during operator management.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0} (or DATABASE_URL)")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Validation or storage failure while creating the operator.
    #[error(transparent)]
    Auth(#[from] AdminAuthError),
}

/// Create a new backoffice operator.
///
/// # Errors
///
/// Returns an error for an invalid email, a short password, a taken email,
/// or a database failure.
pub async fn create_user(
    email: &str,
    name: &str,
    role: BackofficeRole,
    password: &SecretString,
) -> Result<BackofficeUser, AdminError> {
    let url = database_url("ADMIN_DATABASE_URL")
        .ok_or(AdminError::MissingEnvVar("ADMIN_DATABASE_URL"))?;

    tracing::info!("Connecting to admin database...");
    let pool = deskly_admin::db::create_pool(&url).await?;

    tracing::info!("Creating operator: {} ({})", email, role);
    let user = AdminAuthService::new(&pool)
        .create_user(email, name, role, password)
        .await?;

    tracing::info!(
        "Operator created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user)
}
