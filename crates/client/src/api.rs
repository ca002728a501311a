//! Collaborator seams used by the session objects.
//!
//! Every method reports failures as a classified [`ApiError`]; transport
//! errors never leak past an implementation.

use std::future::Future;

use deskly_core::{
    Address, AddressDraft, AddressId, AddressKind, ApiError, BackofficeUser, CustomerProfile,
    NewOrder, Order, OrderId, OrderStatus, Page, PageRequest, Product, ProductId, ShippingQuote,
    StatusChange,
};
use secrecy::SecretString;

/// Customer-facing operations.
pub trait StorefrontApi: Send + Sync {
    fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<CustomerProfile, ApiError>> + Send;

    fn logout(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn list_addresses(&self) -> impl Future<Output = Result<Vec<Address>, ApiError>> + Send;

    fn create_address(
        &self,
        draft: &AddressDraft,
    ) -> impl Future<Output = Result<Address, ApiError>> + Send;

    /// Make `id` the default of `kind`. Returns the customer's full address
    /// list as stored after the change.
    fn set_default_address(
        &self,
        id: AddressId,
        kind: AddressKind,
    ) -> impl Future<Output = Result<Vec<Address>, ApiError>> + Send;

    fn get_product(&self, id: ProductId) -> impl Future<Output = Result<Product, ApiError>> + Send;

    fn shipping_options(&self) -> impl Future<Output = Result<Vec<ShippingQuote>, ApiError>> + Send;

    /// Create an order. Repeating a request with the same idempotency key
    /// returns the order created the first time.
    fn submit_order(&self, order: &NewOrder) -> impl Future<Output = Result<Order, ApiError>> + Send;

    fn list_my_orders(&self) -> impl Future<Output = Result<Vec<Order>, ApiError>> + Send;

    fn get_order(&self, id: OrderId) -> impl Future<Output = Result<Order, ApiError>> + Send;
}

/// Backoffice operations. All of them require an operator login.
pub trait BackofficeApi: Send + Sync {
    fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<BackofficeUser, ApiError>> + Send;

    fn logout(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn list_orders_paged(
        &self,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Order>, ApiError>> + Send;

    fn get_order(&self, id: OrderId) -> impl Future<Output = Result<Order, ApiError>> + Send;

    fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> impl Future<Output = Result<Order, ApiError>> + Send;

    fn reapprove(&self, id: OrderId) -> impl Future<Output = Result<Order, ApiError>> + Send;

    fn order_history(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Vec<StatusChange>, ApiError>> + Send;
}
