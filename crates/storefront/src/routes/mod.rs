//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (login and register are strictly rate limited)
//! POST   /api/auth/register                   - Create an account and log in
//! POST   /api/auth/login                      - Login, sets session cookie
//! POST   /api/auth/logout                     - Logout
//! GET    /api/auth/me                         - Current customer
//!
//! # Catalog
//! GET    /api/products                        - Active products
//! GET    /api/products/{id}                   - Product detail
//! GET    /api/shipping-options                - Shipping quotes
//!
//! # Addresses (requires auth)
//! GET    /api/addresses                       - Customer's addresses
//! POST   /api/addresses                       - Create address
//! PUT    /api/addresses/{id}                  - Replace address
//! DELETE /api/addresses/{id}                  - Delete address
//! PUT    /api/addresses/{id}/default/{kind}   - Make default (delivery|billing)
//!
//! # Orders (requires auth)
//! POST   /api/orders                          - Submit order (idempotent)
//! GET    /api/orders                          - Customer's orders, newest first
//! GET    /api/orders/{id}                     - Order detail
//! ```

pub mod addresses;
pub mod auth;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::FromRequest,
    routing::{get, post, put},
};

use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// JSON body extractor whose rejections are reported as [`AppError`], so
/// malformed bodies get the same error shape as every other failure.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter())
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the catalog routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the address routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::index).post(addresses::create))
        .route("/{id}", put(addresses::update).delete(addresses::delete))
        .route("/{id}/default/{kind}", put(addresses::set_default))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/products", product_routes())
        .route("/shipping-options", get(products::shipping_options))
        .nest("/addresses", address_routes())
        .nest("/orders", order_routes())
        .layer(api_rate_limiter());

    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api", api)
}
