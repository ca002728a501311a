//! Customer sessions.
//!
//! Sessions live in the store's default table, `tower_sessions.session`.
//! `deskly-cli migrate storefront` creates it; the server never does. A
//! customer stays logged in until a week passes without a request. Cookies
//! are signed with the key from `STOREFRONT_SESSION_SECRET`.

use sqlx::PgPool;
use tower_sessions::cookie::{Key, SameSite, time::Duration};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "deskly_session";

const IDLE_TIMEOUT: Duration = Duration::days(7);

/// The customer session store, shared with the migration command.
#[must_use]
pub fn session_store(pool: &PgPool) -> PostgresStore {
    PostgresStore::new(pool.clone())
}

/// Cookie settings for customer sessions around [`session_store`].
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
    key: Key,
) -> SessionManagerLayer<PostgresStore, SignedCookie> {
    SessionManagerLayer::new(session_store(pool))
        .with_signed(key)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(IDLE_TIMEOUT))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
}
