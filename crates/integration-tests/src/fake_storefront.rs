//! In-memory storefront.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use deskly_client::StorefrontApi;
use deskly_core::{
    Address, AddressDraft, AddressId, AddressKind, ApiError, CustomerId, CustomerProfile, Email,
    Money, NewOrder, Order, OrderId, OrderStatus, PricedLine, Product, ProductId, ShippingOption,
    ShippingQuote, apply_default, check_shipping, price_order,
};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::{PASSWORD, http_error};

/// Storefront operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Login,
    Logout,
    ListAddresses,
    CreateAddress,
    SetDefaultAddress,
    GetProduct,
    ShippingOptions,
    SubmitOrder,
    ListOrders,
    GetOrder,
}

struct Account {
    profile: CustomerProfile,
    password: String,
}

struct StoredAddress {
    owner: CustomerId,
    address: Address,
}

struct StoredOrder {
    owner: CustomerId,
    key: Uuid,
    fingerprint: String,
    order: Order,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    current: Option<CustomerId>,
    products: Vec<Product>,
    addresses: Vec<StoredAddress>,
    orders: Vec<StoredOrder>,
    next_id: i64,
    failures: HashMap<Op, VecDeque<ApiError>>,
    calls: HashMap<Op, usize>,
    submit_delay: Option<Duration>,
}

impl State {
    const fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn customer(&self) -> Result<CustomerId, ApiError> {
        self.current
            .ok_or_else(|| http_error(401, "authentication required"))
    }

    fn insert_address(&mut self, owner: CustomerId, draft: AddressDraft) -> Address {
        let address = Address {
            id: AddressId::new(self.next_id()),
            label: draft.label,
            street: draft.street,
            number: draft.number,
            complement: draft.complement,
            district: draft.district,
            city: draft.city,
            state: draft.state,
            zip_code: draft.zip_code,
            is_delivery_default: draft.is_delivery_default,
            is_billing_default: draft.is_billing_default,
        };
        for stored in self.addresses.iter_mut().filter(|s| s.owner == owner) {
            if address.is_delivery_default {
                stored.address.is_delivery_default = false;
            }
            if address.is_billing_default {
                stored.address.is_billing_default = false;
            }
        }
        self.addresses.push(StoredAddress {
            owner,
            address: address.clone(),
        });
        address
    }

    fn addresses_of(&self, owner: CustomerId) -> Vec<Address> {
        self.addresses
            .iter()
            .filter(|s| s.owner == owner)
            .map(|s| s.address.clone())
            .collect()
    }

    /// Same checks, in the same order, as the storefront's order service.
    fn place(&mut self, customer: CustomerId, request: &NewOrder) -> Result<Order, ApiError> {
        let fingerprint = request.fingerprint();
        if let Some(existing) = self
            .orders
            .iter()
            .find(|o| o.owner == customer && o.key == request.idempotency_key)
        {
            if existing.fingerprint != fingerprint {
                return Err(http_error(
                    409,
                    "idempotency key was already used with different contents",
                ));
            }
            return Ok(existing.order.clone());
        }

        if request.items.is_empty() {
            return Err(ApiError::validation("items", "order has no items"));
        }
        let mut lines: Vec<PricedLine> = Vec::new();
        for item in &request.items {
            if item.quantity == 0 {
                return Err(ApiError::validation("items", "quantity must be at least 1"));
            }
            match lines.iter_mut().find(|l| l.product_id == item.product_id) {
                Some(line) => line.quantity += item.quantity,
                None => lines.push(PricedLine {
                    product_id: item.product_id,
                    product_name: String::new(),
                    unit_price: Money::default(),
                    quantity: item.quantity,
                }),
            }
        }
        check_shipping(request.shipping_value)
            .map_err(|e| ApiError::validation("shippingValue", e.to_string()))?;
        let payment = request.payment.validate()?;

        let address = match self
            .addresses
            .iter()
            .find(|s| s.address.id == request.address_id)
        {
            None => return Err(http_error(404, "address not found")),
            Some(stored) if stored.owner != customer => {
                return Err(http_error(403, "address belongs to another customer"));
            }
            Some(stored) => stored.address.snapshot(),
        };

        for line in &mut lines {
            let product = self
                .products
                .iter()
                .find(|p| p.id == line.product_id && p.active)
                .ok_or_else(|| {
                    http_error(404, &format!("product {} is not available", line.product_id))
                })?;
            line.product_name.clone_from(&product.name);
            line.unit_price = product.price;
        }

        let priced = price_order(lines, request.shipping_value)
            .map_err(|e| ApiError::validation("items", e.to_string()))?;
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(self.next_id()),
            items: priced.items,
            address,
            shipping_value: priced.shipping_value,
            total_value: priced.total_value,
            payment_method: payment.method(),
            card_holder_name: payment.card_holder_name().map(str::to_owned),
            card_last_four_digits: payment.card_last_four(),
            status: OrderStatus::AwaitingPayment,
            created_at: now,
            updated_at: now,
        };
        self.orders.push(StoredOrder {
            owner: customer,
            key: request.idempotency_key,
            fingerprint,
            order: order.clone(),
        });
        Ok(order)
    }

    fn order_for(&self, customer: CustomerId, id: OrderId) -> Result<Order, ApiError> {
        match self.orders.iter().find(|o| o.order.id == id) {
            None => Err(http_error(404, "order not found")),
            Some(stored) if stored.owner != customer => {
                Err(http_error(403, "order belongs to another customer"))
            }
            Some(stored) => Ok(stored.order.clone()),
        }
    }
}

/// Storefront double. Clones share state, so a test can keep a handle
/// after moving one into a session.
#[derive(Clone, Default)]
pub struct FakeStorefront {
    state: Arc<Mutex<State>>,
}

impl FakeStorefront {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call and hand back an injected failure, if any.
    fn begin(&self, op: Op) -> Result<(), ApiError> {
        let mut state = self.state();
        *state.calls.entry(op).or_default() += 1;
        match state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Register a customer whose password is [`PASSWORD`].
    ///
    /// # Panics
    ///
    /// Panics if `email` is not a valid address.
    #[must_use]
    pub fn add_customer(&self, email: &str, name: &str) -> CustomerId {
        let mut state = self.state();
        let id = CustomerId::new(state.next_id());
        state.accounts.push(Account {
            profile: CustomerProfile {
                id,
                email: Email::parse(email).expect("valid test email"),
                name: name.to_owned(),
            },
            password: PASSWORD.to_owned(),
        });
        id
    }

    #[must_use]
    pub fn add_product(&self, name: &str, price_cents: i64) -> ProductId {
        let mut state = self.state();
        let id = ProductId::new(state.next_id());
        state.products.push(Product {
            id,
            name: name.to_owned(),
            price: Money::from_cents(price_cents),
            image_ref: None,
            active: true,
        });
        id
    }

    pub fn set_price(&self, id: ProductId, price_cents: i64) {
        if let Some(product) = self.state().products.iter_mut().find(|p| p.id == id) {
            product.price = Money::from_cents(price_cents);
        }
    }

    pub fn deactivate(&self, id: ProductId) {
        if let Some(product) = self.state().products.iter_mut().find(|p| p.id == id) {
            product.active = false;
        }
    }

    /// Store an address directly, as if created in an earlier session.
    ///
    /// # Panics
    ///
    /// Panics if the draft is incomplete.
    #[must_use]
    pub fn add_address(&self, owner: CustomerId, draft: AddressDraft) -> Address {
        let draft = draft.validate().expect("valid test draft");
        self.state().insert_address(owner, draft)
    }

    pub fn delete_address(&self, id: AddressId) {
        self.state().addresses.retain(|s| s.address.id != id);
    }

    #[must_use]
    pub fn addresses_of(&self, owner: CustomerId) -> Vec<Address> {
        self.state().addresses_of(owner)
    }

    /// Every stored order, oldest first.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.state().orders.iter().map(|o| o.order.clone()).collect()
    }

    /// Queue a failure for the next call of `op`.
    pub fn fail_next(&self, op: Op, err: ApiError) {
        self.state().failures.entry(op).or_default().push_back(err);
    }

    #[must_use]
    pub fn calls(&self, op: Op) -> usize {
        self.state().calls.get(&op).copied().unwrap_or_default()
    }

    /// Delay order responses. The order is stored before the delay, like a
    /// server that committed but answered too late.
    pub fn set_submit_delay(&self, delay: Option<Duration>) {
        self.state().submit_delay = delay;
    }

    /// Drop the server-side session.
    pub fn expire_session(&self) {
        self.state().current = None;
    }
}

impl StorefrontApi for FakeStorefront {
    async fn login(&self, email: &str, password: &SecretString) -> Result<CustomerProfile, ApiError> {
        self.begin(Op::Login)?;
        let mut state = self.state();
        let profile = state
            .accounts
            .iter()
            .find(|a| a.profile.email.as_str() == email && a.password == password.expose_secret())
            .map(|a| a.profile.clone())
            .ok_or_else(|| http_error(401, "invalid email or password"))?;
        state.current = Some(profile.id);
        Ok(profile)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.begin(Op::Logout)?;
        self.state().current = None;
        Ok(())
    }

    async fn list_addresses(&self) -> Result<Vec<Address>, ApiError> {
        self.begin(Op::ListAddresses)?;
        let state = self.state();
        let customer = state.customer()?;
        Ok(state.addresses_of(customer))
    }

    async fn create_address(&self, draft: &AddressDraft) -> Result<Address, ApiError> {
        self.begin(Op::CreateAddress)?;
        let mut state = self.state();
        let customer = state.customer()?;
        let draft = draft.clone().validate()?;
        Ok(state.insert_address(customer, draft))
    }

    async fn set_default_address(
        &self,
        id: AddressId,
        kind: AddressKind,
    ) -> Result<Vec<Address>, ApiError> {
        self.begin(Op::SetDefaultAddress)?;
        let mut state = self.state();
        let customer = state.customer()?;
        match state.addresses.iter().find(|s| s.address.id == id) {
            None => return Err(http_error(404, "address not found")),
            Some(stored) if stored.owner != customer => {
                return Err(http_error(403, "address belongs to another customer"));
            }
            Some(_) => {}
        }

        let mut addresses = state.addresses_of(customer);
        apply_default(&mut addresses, id, kind)?;
        for updated in &addresses {
            if let Some(stored) = state.addresses.iter_mut().find(|s| s.address.id == updated.id) {
                stored.address = updated.clone();
            }
        }
        Ok(addresses)
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.begin(Op::GetProduct)?;
        self.state()
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| http_error(404, "product not found"))
    }

    async fn shipping_options(&self) -> Result<Vec<ShippingQuote>, ApiError> {
        self.begin(Op::ShippingOptions)?;
        Ok(ShippingOption::ALL.into_iter().map(ShippingOption::quote).collect())
    }

    async fn submit_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        self.begin(Op::SubmitOrder)?;
        let delay = self.state().submit_delay;
        let result = {
            let mut state = self.state();
            let customer = state.customer()?;
            state.place(customer, order)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn list_my_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.begin(Op::ListOrders)?;
        let state = self.state();
        let customer = state.customer()?;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| o.owner == customer)
            .map(|o| o.order.clone())
            .collect())
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.begin(Op::GetOrder)?;
        let state = self.state();
        let customer = state.customer()?;
        state.order_for(customer, id)
    }
}
