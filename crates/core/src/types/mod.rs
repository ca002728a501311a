//! Core types for Deskly.
//!
//! This module provides type-safe wrappers for the checkout and order domain.

pub mod account;
pub mod address;
pub mod cart;
pub mod email;
pub mod id;
pub mod money;
pub mod order;
pub mod page;
pub mod payment;
pub mod product;
pub mod status;

pub use account::{BackofficeUser, CustomerProfile, LoginRequest};
pub use address::{
    Address, AddressDraft, AddressError, AddressKind, AddressSnapshot, PostalAddress, apply_default,
    default_of, normalize_zip,
};
pub use cart::{Cart, CartError, CartLine, ProductSnapshot};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::Money;
pub use order::{
    NewOrder, NewOrderItem, Order, OrderItem, PricedLine, PricedOrder, PricingError, ShippingOption,
    ShippingQuote, StatusChange, StatusUpdate, check_shipping, price_order,
};
pub use page::{Page, PageRequest};
pub use payment::{CardBrand, CardDetails, PaymentError, PaymentSelection, ValidatedPayment};
pub use product::Product;
pub use status::*;
