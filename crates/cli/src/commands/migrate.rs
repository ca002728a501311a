//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront migrations
//! deskly-cli migrate storefront
//!
//! # Run admin migrations (needs the storefront schema)
//! deskly-cli migrate admin
//!
//! # Run all migrations
//! deskly-cli migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for storefront
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for admin
//! - `DATABASE_URL` - Fallback for either of the above
//!
//! # Migration Files
//!
//! Storefront migrations: `crates/storefront/migrations/`
//! Admin migrations: `crates/admin/migrations/`
//!
//! Both sets share one `_sqlx_migrations` table, so each migrator ignores
//! versions applied by the other. Session tables are created by the session
//! store itself after the schema migrations.

use thiserror::Error;
use tracing::info;

use super::database_url;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0} (or DATABASE_URL)")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session store error: {0}")]
    SessionStore(String),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    let url = database_url("STOREFRONT_DATABASE_URL")
        .ok_or(MigrationError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    info!("Connecting to storefront database...");
    let pool = deskly_storefront::db::create_pool(&url).await?;

    info!("Running storefront migrations...");
    let mut migrator = sqlx::migrate!("../storefront/migrations");
    migrator.set_ignore_missing(true);
    migrator.run(&pool).await?;

    info!("Creating storefront session table...");
    deskly_storefront::middleware::session_store(&pool)
        .migrate()
        .await?;

    info!("Storefront migrations complete");
    Ok(())
}

/// Run admin database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn admin() -> Result<(), MigrationError> {
    let url = database_url("ADMIN_DATABASE_URL")
        .ok_or(MigrationError::MissingEnvVar("ADMIN_DATABASE_URL"))?;

    info!("Connecting to admin database...");
    let pool = deskly_admin::db::create_pool(&url).await?;

    info!("Running admin migrations...");
    let mut migrator = sqlx::migrate!("../admin/migrations");
    migrator.set_ignore_missing(true);
    migrator.run(&pool).await?;

    info!("Creating admin session table...");
    deskly_admin::middleware::session_store(&pool)
        .map_err(MigrationError::SessionStore)?
        .migrate()
        .await?;

    info!("Admin migrations complete");
    Ok(())
}
