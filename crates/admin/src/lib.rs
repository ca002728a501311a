//! Deskly Admin library.
//!
//! The backoffice JSON API: operators list every customer's orders and move
//! them through the fulfillment statuses. Exposed as a library so the CLI
//! can create operators with the same hashing rules.
//!
//! # Security
//!
//! This crate can change any order's status. Deploy it on a private network
//! only.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
