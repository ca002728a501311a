//! Domain models for the backoffice.

pub mod session;

pub use session::{CurrentAdmin, keys as session_keys};
