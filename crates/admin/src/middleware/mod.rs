//! HTTP middleware for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID
//! 4. Session layer (`admin.session` table)
//! 5. `no-store` and framing headers

pub mod auth;
pub mod request_id;
pub mod session;

use axum::{
    extract::Request,
    http::{
        HeaderValue,
        header::{CACHE_CONTROL, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
    },
    middleware::Next,
    response::Response,
};

pub use auth::{
    OptionalAdminAuth, RequireAdminAuth, RequireOrderWriter, clear_current_admin,
    set_current_admin,
};
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, session_store};

/// Backoffice responses carry customer data; never cache or frame them.
pub async fn no_store_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}
