//! Integration test support for Deskly.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory scenarios (no servers needed)
//! cargo test -p deskly-integration-tests
//!
//! # Live tests against running servers and a migrated, seeded database
//! cargo test -p deskly-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - Checkout orchestration over an in-memory storefront
//! - `address_defaults` - Address Resolver and default flags
//! - `order_lifecycle` - Backoffice status changes and transition policies
//! - `error_mapping` - Error classes across client and servers
//! - `live_api` - `#[ignore]`d end-to-end tests over HTTP
//!
//! The fakes implement the client's collaborator traits with the same
//! rules the servers apply: ownership checks, catalog pricing, idempotent
//! submission, the backoffice transition policy and role checks.

#![cfg_attr(not(test), forbid(unsafe_code))]

mod fake_backoffice;
mod fake_storefront;

pub use fake_backoffice::FakeBackoffice;
pub use fake_storefront::{FakeStorefront, Op};

use deskly_core::{AddressDraft, ApiError, ErrorClass};
use secrecy::SecretString;

/// Password used by every fake account.
pub const PASSWORD: &str = "correct horse battery";

#[must_use]
pub fn password() -> SecretString {
    SecretString::from(PASSWORD)
}

/// A complete draft in Recife. Tweak fields with struct update syntax.
#[must_use]
pub fn draft(label: &str) -> AddressDraft {
    AddressDraft {
        label: label.to_owned(),
        street: "Rua da Aurora".to_owned(),
        number: "100".to_owned(),
        complement: None,
        district: "Boa Vista".to_owned(),
        city: "Recife".to_owned(),
        state: "PE".to_owned(),
        zip_code: "50050-000".to_owned(),
        is_delivery_default: false,
        is_billing_default: false,
    }
}

/// Error carrying the status code a server would have answered with.
#[must_use]
pub fn http_error(status: u16, message: &str) -> ApiError {
    ApiError {
        status: Some(status),
        ..ApiError::new(ErrorClass::from_status(status), message)
    }
}
