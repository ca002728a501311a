//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Customer registration and password login
//! - `orders` - Order submission: validation, catalog pricing, idempotent insert

pub mod auth;
pub mod orders;

pub use auth::{AuthError, AuthService};
pub use orders::{OrderService, Placement};
