//! Deskly Core - Domain types and checkout rules.
//!
//! This crate provides the types shared by every Deskly component:
//! - `storefront` - Customer-facing JSON API
//! - `admin` - Backoffice JSON API for order fulfillment
//! - `client` - Customer and operator SDK (checkout orchestration)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The checkout state machine lives here so that both
//! its transitions and its side effects can be tested without a network.
//!
//! # Modules
//!
//! - [`types`] - IDs, money, addresses, carts, payments, orders and statuses
//! - [`error`] - Error classes shared by the servers and the client
//! - [`checkout`] - The checkout finite-state machine
//! - `config` - Environment helpers for the servers (feature `config`)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
#[cfg(feature = "config")]
pub mod config;
pub mod error;
pub mod types;

pub use error::{ApiError, ErrorBody, ErrorClass};
pub use types::*;
