//! Business logic services for the backoffice.

pub mod auth;
pub mod lifecycle;

pub use auth::{AdminAuthError, AdminAuthService};
pub use lifecycle::{LifecycleError, OrderLifecycle};
