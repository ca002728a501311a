//! Deskly Client - Customer and operator SDK.
//!
//! Everything here is scoped to an explicit session object. There is no
//! global auth token and no global cart:
//!
//! - [`CustomerSession`] owns the customer's login state and cart. Checkout
//!   borrows it mutably, so only one checkout (and one submission) can run
//!   per session.
//! - [`BackofficeSession`] owns an operator login and hands out an
//!   [`OrderLifecycleClient`] for status changes.
//!
//! Network access goes through the [`StorefrontApi`] and [`BackofficeApi`]
//! traits. [`HttpStorefront`] and [`HttpBackoffice`] are the `reqwest`
//! implementations; tests use in-memory fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use deskly_client::{ClientConfig, CustomerSession, HttpStorefront};
//!
//! let config = ClientConfig::from_env()?;
//! let mut session = CustomerSession::new(HttpStorefront::new(&config)?);
//! session.login("ana@example.com", &password).await?;
//! session.add_to_cart(ProductId::new(1), 2).await?;
//!
//! let mut checkout = session.checkout(config.submit_timeout);
//! checkout.begin().await?;
//! checkout.confirm_address().await?;
//! let order = checkout.submit(PaymentSelection::boleto()).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod api;
pub mod backoffice;
pub mod checkout;
pub mod config;
mod http;
pub mod postal;
pub mod session;
pub mod storefront;

pub use address::AddressResolver;
pub use api::{BackofficeApi, StorefrontApi};
pub use backoffice::{BackofficeSession, HttpBackoffice, OrderLifecycleClient};
pub use checkout::CheckoutOrchestrator;
pub use config::{ClientConfig, ConfigError};
pub use postal::{PostalLookup, ViaCep};
pub use session::{CustomerSession, SessionError};
pub use storefront::HttpStorefront;
