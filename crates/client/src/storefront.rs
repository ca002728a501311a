//! `reqwest` implementation of [`StorefrontApi`].

use deskly_core::{
    Address, AddressDraft, AddressId, AddressKind, ApiError, CustomerProfile, LoginRequest,
    NewOrder, Order, OrderId, Product, ProductId, ShippingQuote,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use crate::api::StorefrontApi;
use crate::config::ClientConfig;
use crate::http::JsonClient;

/// Storefront API over HTTP. The session cookie lives in this client.
#[derive(Clone)]
pub struct HttpStorefront {
    http: JsonClient,
}

impl HttpStorefront {
    /// # Errors
    ///
    /// Returns a `Network` error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            http: JsonClient::new(&config.storefront_url, config.request_timeout)?,
        })
    }
}

impl StorefrontApi for HttpStorefront {
    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &SecretString) -> Result<CustomerProfile, ApiError> {
        let body = LoginRequest {
            email: email.to_owned(),
            password: password.expose_secret().to_owned(),
        };
        self.http.post("/api/auth/login", &body).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.http.post_empty("/api/auth/logout").await
    }

    async fn list_addresses(&self) -> Result<Vec<Address>, ApiError> {
        self.http.get("/api/addresses").await
    }

    async fn create_address(&self, draft: &AddressDraft) -> Result<Address, ApiError> {
        self.http.post("/api/addresses", draft).await
    }

    #[instrument(skip(self), fields(address_id = %id, kind = %kind))]
    async fn set_default_address(
        &self,
        id: AddressId,
        kind: AddressKind,
    ) -> Result<Vec<Address>, ApiError> {
        self.http
            .put_unit(&format!("/api/addresses/{id}/default/{kind}"))
            .await
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.http.get(&format!("/api/products/{id}")).await
    }

    async fn shipping_options(&self) -> Result<Vec<ShippingQuote>, ApiError> {
        self.http.get("/api/shipping-options").await
    }

    #[instrument(skip(self, order), fields(idempotency_key = %order.idempotency_key))]
    async fn submit_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        self.http.post("/api/orders", order).await
    }

    async fn list_my_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.http.get("/api/orders").await
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.http.get(&format!("/api/orders/{id}")).await
    }
}
