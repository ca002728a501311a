//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST  /api/auth/login               - Operator login
//! POST  /api/auth/logout              - Logout
//! GET   /api/auth/me                  - Current operator
//!
//! # Orders (any role)
//! GET   /api/orders?page=&size=       - All orders, newest first, paged
//! GET   /api/orders/{id}              - Order detail
//! GET   /api/orders/{id}/history      - Status change history
//!
//! # Orders (admin and operator roles)
//! PATCH /api/orders/{id}/status       - Set status
//! POST  /api/orders/{id}/reapprove    - PAGAMENTO_REJEITADO -> PAGAMENTO_APROVADO
//! ```

pub mod auth;
pub mod orders;

use axum::{
    Router,
    extract::FromRequest,
    routing::{get, patch, post},
};

use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor whose rejections are reported as [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", patch(orders::update_status))
        .route("/{id}/reapprove", post(orders::reapprove))
        .route("/{id}/history", get(orders::history))
}

/// Create all routes for the admin API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/orders", order_routes())
}
