//! Customer session: login state and the Cart Store.

use std::time::Duration;

use deskly_core::{
    ApiError, Cart, CartError, CartLine, CustomerProfile, ErrorClass, Order, OrderId, ProductId,
};
use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, instrument};

use crate::address::AddressResolver;
use crate::api::StorefrontApi;
use crate::checkout::CheckoutOrchestrator;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("product {0} is not available")]
    ProductUnavailable(ProductId),
}

/// One customer's session.
///
/// Created logged out with an empty cart. [`Self::login`] and
/// [`Self::logout`] are the only ways in and out; an expired server session
/// (an `Auth` error) logs out locally but keeps the cart.
pub struct CustomerSession<A> {
    api: A,
    customer: Option<CustomerProfile>,
    cart: Cart,
}

impl<A: StorefrontApi> CustomerSession<A> {
    #[must_use]
    pub const fn new(api: A) -> Self {
        Self {
            api,
            customer: None,
            cart: Cart::new(),
        }
    }

    /// # Errors
    ///
    /// Returns an `Auth` error for bad credentials, or the request failure.
    #[instrument(skip(self, password))]
    pub async fn login(
        &mut self,
        email: &str,
        password: &SecretString,
    ) -> Result<&CustomerProfile, ApiError> {
        let profile = self.api.login(email, password).await?;
        info!(customer_id = %profile.id, "Customer logged in");
        Ok(self.customer.insert(profile))
    }

    /// End the session on the server and drop all local state, cart
    /// included. Local state is dropped even if the request fails.
    ///
    /// # Errors
    ///
    /// Returns the request failure.
    pub async fn logout(&mut self) -> Result<(), ApiError> {
        let result = self.api.logout().await;
        self.customer = None;
        self.cart.clear();
        result
    }

    /// Forget the login after the server rejected it. The cart is kept so
    /// the customer can log in again and carry on.
    pub fn expire(&mut self) {
        if let Some(customer) = self.customer.take() {
            info!(customer_id = %customer.id, "Customer session expired");
        }
    }

    #[must_use]
    pub const fn customer(&self) -> Option<&CustomerProfile> {
        self.customer.as_ref()
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.customer.is_some()
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    pub(crate) const fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    /// Fetch a product and put `quantity` units of it in the cart.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Fails for a zero quantity, an inactive product, or a failed request.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<u32, SessionError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity.into());
        }
        let result = self.api.get_product(product_id).await;
        let product = self.guard(result)?;
        if !product.active {
            return Err(SessionError::ProductUnavailable(product_id));
        }
        Ok(self.cart.add(product_id, product.snapshot(), quantity)?)
    }

    /// # Errors
    ///
    /// Returns [`CartError::UnknownProduct`] if the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        self.cart.set_quantity(product_id, quantity)
    }

    pub fn remove_from_cart(&mut self, product_id: ProductId) -> Option<CartLine> {
        self.cart.remove(product_id)
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    /// Address book bound to this session's API.
    #[must_use]
    pub const fn addresses(&self) -> AddressResolver<'_, A> {
        AddressResolver::new(&self.api)
    }

    /// Start a checkout. The session is borrowed until it is dropped.
    pub fn checkout(&mut self, submit_timeout: Duration) -> CheckoutOrchestrator<'_, A> {
        CheckoutOrchestrator::new(self, submit_timeout)
    }

    /// The customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns the request failure. An `Auth` failure also expires the session.
    pub async fn my_orders(&mut self) -> Result<Vec<Order>, ApiError> {
        let result = self.api.list_my_orders().await;
        self.guard(result)
    }

    /// # Errors
    ///
    /// Returns the request failure. An `Auth` failure also expires the session.
    pub async fn order(&mut self, id: OrderId) -> Result<Order, ApiError> {
        let result = self.api.get_order(id).await;
        self.guard(result)
    }

    fn guard<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(err) = &result
            && err.class == ErrorClass::Auth
        {
            self.expire();
        }
        result
    }
}
