//! Domain models for storefront.
//!
//! Shared domain types live in `deskly_core`; this module only holds what
//! the storefront keeps in its own session.

pub mod session;

pub use session::{CurrentCustomer, keys as session_keys};
