//! Deskly Storefront library.
//!
//! The customer-facing JSON API: accounts, address book, catalog and order
//! submission. Exposed as a library so the CLI can reuse its repositories
//! and password hashing.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
