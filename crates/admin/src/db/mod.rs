//! Database operations for the backoffice.
//!
//! # Schema: `admin`
//!
//! ## Tables
//!
//! - `backoffice_user` - Operators (argon2 password hashes, role)
//! - `order_status_event` - Audit trail of status changes
//! - `session` - Operator sessions (tower-sessions store)
//!
//! Orders are read from and updated in `storefront."order"`; the storefront
//! migrations must run first.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p deskly-cli -- migrate admin
//! ```

pub mod backoffice_users;
pub mod orders;
pub mod status_events;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use backoffice_users::BackofficeUserRepository;
pub use orders::OrderRepository;
pub use status_events::StatusEventRepository;

/// Failures of the backoffice repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value does not fit its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("not found")]
    NotFound,

    /// A unique constraint rejected the write.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// `Conflict(message)` for a unique violation, `Database` otherwise.
    pub(crate) fn unique(e: sqlx::Error, message: &str) -> Self {
        match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Self::Conflict(message.to_owned())
            }
            other => Self::Database(other),
        }
    }
}

/// Connect to the backoffice database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
