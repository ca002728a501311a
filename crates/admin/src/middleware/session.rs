//! Backoffice sessions.
//!
//! Stored in `admin.session`, separate from customer sessions. Cookies are
//! `SameSite=Strict`, signed with the key from `ADMIN_SESSION_SECRET`, and
//! expire after a day of inactivity.

use sqlx::PgPool;
use tower_sessions::cookie::{Key, SameSite, time::Duration};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AdminConfig;

pub const SESSION_COOKIE_NAME: &str = "deskly_admin_session";

const IDLE_TIMEOUT: Duration = Duration::hours(24);

/// Session store in the `admin` schema.
///
/// # Errors
///
/// Returns the store's message if it rejects the schema or table name.
pub fn session_store(pool: &PgPool) -> Result<PostgresStore, String> {
    PostgresStore::new(pool.clone())
        .with_schema_name("admin")?
        .with_table_name("session")
}

#[must_use]
pub fn create_session_layer(
    store: PostgresStore,
    config: &AdminConfig,
    key: Key,
) -> SessionManagerLayer<PostgresStore, SignedCookie> {
    SessionManagerLayer::new(store)
        .with_signed(key)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(IDLE_TIMEOUT))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Strict)
        .with_http_only(true)
}
