//! Checkout finite-state machine.
//!
//! ```text
//! CART -> ADDRESS -> PAYMENT -> SUBMITTING -> CONFIRMATION
//!           \           \    <-----'
//!            `-----------`--> ABORTED (cart emptied or abandoned)
//! ```
//!
//! [`Checkout::transition`] is pure: it takes an [`Event`] and returns the
//! next state plus the [`Effect`]s the caller must run. Effect results are
//! fed back as events. A refused event returns a [`CheckoutError`] and the
//! current state stays as it was.
//!
//! The machine never advances on a collaborator error. The step where the
//! error happened is kept along with everything entered so far, and the
//! error is stored on it. An `Auth` error ends the session and sends the
//! customer back to the cart with their items intact.

use uuid::Uuid;

use crate::error::{ApiError, ErrorClass};
use crate::types::{
    Address, AddressDraft, AddressError, AddressId, AddressKind, CartError, NewOrder, NewOrderItem,
    Order, PaymentError, PaymentSelection, ShippingOption, apply_default, default_of,
};

/// Why an event was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("no delivery address selected")]
    NoAddressSelected,
    #[error("address {0} is not one of the customer's addresses")]
    UnknownAddress(AddressId),
    #[error("addresses are still loading")]
    AddressesLoading,
    #[error("an address is already being created")]
    AddressCreationInFlight,
    #[error("an order submission is already in flight")]
    SubmissionInFlight,
    #[error("{event} is not valid in {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CheckoutError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Api(err) => err.class,
            Self::InvalidTransition { .. }
            | Self::SubmissionInFlight
            | Self::AddressCreationInFlight
            | Self::AddressesLoading => ErrorClass::Conflict,
            Self::UnknownAddress(_) => ErrorClass::NotFound,
            Self::EmptyCart
            | Self::NoAddressSelected
            | Self::Address(_)
            | Self::Payment(_)
            | Self::Cart(_) => ErrorClass::Validation,
        }
    }
}

/// Input to the machine: user actions and collaborator results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Enter checkout with the current cart contents.
    Begin {
        items: Vec<NewOrderItem>,
        idempotency_key: Uuid,
    },
    AddressesLoaded(Vec<Address>),
    AddressesFailed(ApiError),
    ReloadAddresses,
    SelectAddress(AddressId),
    CreateAddress(AddressDraft),
    AddressCreated(Address),
    AddressCreationFailed(ApiError),
    /// Proceed from ADDRESS to PAYMENT with the selected address.
    ConfirmAddress,
    ChooseShipping(ShippingOption),
    Back,
    Submit(PaymentSelection),
    OrderPlaced(Order),
    SubmissionFailed(ApiError),
    /// The cart was modified while checking out.
    CartChanged(Vec<NewOrderItem>),
    Abandon,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Begin { .. } => "Begin",
            Self::AddressesLoaded(_) => "AddressesLoaded",
            Self::AddressesFailed(_) => "AddressesFailed",
            Self::ReloadAddresses => "ReloadAddresses",
            Self::SelectAddress(_) => "SelectAddress",
            Self::CreateAddress(_) => "CreateAddress",
            Self::AddressCreated(_) => "AddressCreated",
            Self::AddressCreationFailed(_) => "AddressCreationFailed",
            Self::ConfirmAddress => "ConfirmAddress",
            Self::ChooseShipping(_) => "ChooseShipping",
            Self::Back => "Back",
            Self::Submit(_) => "Submit",
            Self::OrderPlaced(_) => "OrderPlaced",
            Self::SubmissionFailed(_) => "SubmissionFailed",
            Self::CartChanged(_) => "CartChanged",
            Self::Abandon => "Abandon",
        }
    }
}

/// Work the caller must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadAddresses,
    CreateAddress(AddressDraft),
    SubmitOrder(NewOrder),
    /// Empty the session cart. Only emitted after a confirmed order.
    ClearCart,
    /// Drop the customer session; it is no longer valid.
    EndSession,
}

/// ADDRESS step data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressStep {
    pub addresses: Vec<Address>,
    pub selected: Option<AddressId>,
    /// Set when the customer has no address yet.
    pub must_create_address: bool,
    /// Draft being created, kept on failure so it can be resubmitted.
    pub pending_draft: Option<AddressDraft>,
    pub last_error: Option<ApiError>,
    pub loading: bool,
    pub creating: bool,
}

impl AddressStep {
    fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    fn busy(&self) -> Option<CheckoutError> {
        if self.loading {
            Some(CheckoutError::AddressesLoading)
        } else if self.creating {
            Some(CheckoutError::AddressCreationInFlight)
        } else {
            None
        }
    }

    #[must_use]
    pub fn selected_address(&self) -> Option<&Address> {
        let id = self.selected?;
        self.addresses.iter().find(|a| a.id == id)
    }
}

/// PAYMENT (and SUBMITTING) step data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentStep {
    /// Address list from the previous step, restored on `Back`.
    pub addresses: Vec<Address>,
    pub address: Address,
    pub shipping: ShippingOption,
    pub last_selection: Option<PaymentSelection>,
    pub last_error: Option<ApiError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Cart,
    Address(AddressStep),
    Payment(PaymentStep),
    /// An order submission is in flight. No other submission is accepted.
    Submitting(PaymentStep),
    Confirmation(Box<Order>),
    Aborted,
}

impl Step {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cart => "CART",
            Self::Address(_) => "ADDRESS",
            Self::Payment(_) => "PAYMENT",
            Self::Submitting(_) => "SUBMITTING",
            Self::Confirmation(_) => "CONFIRMATION",
            Self::Aborted => "ABORTED",
        }
    }
}

/// Result of a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: Checkout,
    pub effects: Vec<Effect>,
}

/// State of one checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    step: Step,
    items: Vec<NewOrderItem>,
    idempotency_key: Uuid,
}

impl Default for Checkout {
    fn default() -> Self {
        Self::new()
    }
}

impl Checkout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            step: Step::Cart,
            items: Vec::new(),
            idempotency_key: Uuid::nil(),
        }
    }

    #[must_use]
    pub const fn step(&self) -> &Step {
        &self.step
    }

    #[must_use]
    pub fn items(&self) -> &[NewOrderItem] {
        &self.items
    }

    /// Namespace for this checkout's submission keys.
    #[must_use]
    pub const fn idempotency_key(&self) -> Uuid {
        self.idempotency_key
    }

    /// Idempotency key for submitting `order` from this checkout.
    ///
    /// Derived from the order's fingerprint: resubmitting the same order
    /// reuses the key, while a changed cart, address, shipping option or
    /// payment method gets a key of its own.
    #[must_use]
    pub fn submission_key(&self, order: &NewOrder) -> Uuid {
        Uuid::new_v5(&self.idempotency_key, order.fingerprint().as_bytes())
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self.step, Step::Submitting(_))
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.step, Step::Confirmation(_) | Step::Aborted)
    }

    /// The created order, once in CONFIRMATION.
    #[must_use]
    pub fn order(&self) -> Option<&Order> {
        match &self.step {
            Step::Confirmation(order) => Some(order),
            _ => None,
        }
    }

    /// Error stored on the current step by the last failed collaborator call.
    #[must_use]
    pub const fn last_error(&self) -> Option<&ApiError> {
        match &self.step {
            Step::Address(step) => step.last_error.as_ref(),
            Step::Payment(step) | Step::Submitting(step) => step.last_error.as_ref(),
            _ => None,
        }
    }

    /// Apply an event in place and return the effects to run.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Checkout::transition`]; `self` is unchanged.
    pub fn apply(&mut self, event: Event) -> Result<Vec<Effect>, CheckoutError> {
        let Transition { state, effects } = self.transition(event)?;
        *self = state;
        Ok(effects)
    }

    /// Compute the next state for `event`.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] when a guard refuses the event.
    pub fn transition(&self, event: Event) -> Result<Transition, CheckoutError> {
        if is_auth_failure(&event)
            && matches!(self.step, Step::Address(_) | Step::Payment(_) | Step::Submitting(_))
        {
            return Ok(self.session_expired());
        }

        let event_name = event.name();
        match (&self.step, event) {
            (
                Step::Cart | Step::Aborted,
                Event::Begin {
                    items,
                    idempotency_key,
                },
            ) => {
                if items.is_empty() {
                    return Err(CheckoutError::EmptyCart);
                }
                Ok(Transition {
                    state: Self {
                        step: Step::Address(AddressStep::loading()),
                        items,
                        idempotency_key,
                    },
                    effects: vec![Effect::LoadAddresses],
                })
            }

            (Step::Cart, Event::CartChanged(items)) => Ok(self.with(Step::Cart, items, vec![])),

            (Step::Address(_) | Step::Payment(_), Event::CartChanged(items)) if items.is_empty() => {
                Ok(self.with(Step::Aborted, items, vec![]))
            }
            (Step::Address(_) | Step::Payment(_), Event::CartChanged(items)) => {
                Ok(self.with(self.step.clone(), items, vec![]))
            }

            (Step::Address(_) | Step::Payment(_) | Step::Cart, Event::Abandon) => {
                Ok(self.goto(Step::Aborted, vec![]))
            }

            (Step::Submitting(_), Event::Submit(_) | Event::Back | Event::CartChanged(_) | Event::Abandon) => {
                Err(CheckoutError::SubmissionInFlight)
            }

            (Step::Address(step), event) => self.on_address(step, event),
            (Step::Payment(step), event) => self.on_payment(step, event),

            (Step::Submitting(_), Event::OrderPlaced(order)) => {
                Ok(self.goto(Step::Confirmation(Box::new(order)), vec![Effect::ClearCart]))
            }
            (Step::Submitting(step), Event::SubmissionFailed(err)) => {
                let step = PaymentStep {
                    last_error: Some(err),
                    ..step.clone()
                };
                Ok(self.goto(Step::Payment(step), vec![]))
            }

            (state, _) => Err(CheckoutError::InvalidTransition {
                state: state.name(),
                event: event_name,
            }),
        }
    }

    fn on_address(&self, step: &AddressStep, event: Event) -> Result<Transition, CheckoutError> {
        let event_name = event.name();
        match event {
            Event::AddressesLoaded(addresses) if step.loading => {
                let selected = step
                    .selected
                    .filter(|id| addresses.iter().any(|a| a.id == *id))
                    .or_else(|| default_of(&addresses, AddressKind::Delivery).map(|a| a.id));
                let next = AddressStep {
                    must_create_address: addresses.is_empty(),
                    addresses,
                    selected,
                    loading: false,
                    last_error: None,
                    ..step.clone()
                };
                Ok(self.goto(Step::Address(next), vec![]))
            }
            Event::AddressesFailed(err) if step.loading => {
                let next = AddressStep {
                    loading: false,
                    last_error: Some(err),
                    ..step.clone()
                };
                Ok(self.goto(Step::Address(next), vec![]))
            }
            Event::ReloadAddresses => {
                if let Some(busy) = step.busy() {
                    return Err(busy);
                }
                let next = AddressStep {
                    loading: true,
                    last_error: None,
                    ..step.clone()
                };
                Ok(self.goto(Step::Address(next), vec![Effect::LoadAddresses]))
            }
            Event::SelectAddress(id) => {
                if let Some(busy) = step.busy() {
                    return Err(busy);
                }
                if !step.addresses.iter().any(|a| a.id == id) {
                    return Err(CheckoutError::UnknownAddress(id));
                }
                let next = AddressStep {
                    selected: Some(id),
                    last_error: None,
                    ..step.clone()
                };
                Ok(self.goto(Step::Address(next), vec![]))
            }
            Event::CreateAddress(draft) => {
                if let Some(busy) = step.busy() {
                    return Err(busy);
                }
                let draft = draft.validate()?;
                let next = AddressStep {
                    pending_draft: Some(draft.clone()),
                    creating: true,
                    last_error: None,
                    ..step.clone()
                };
                Ok(self.goto(Step::Address(next), vec![Effect::CreateAddress(draft)]))
            }
            Event::AddressCreated(address) if step.creating => {
                let mut addresses = step.addresses.clone();
                let id = address.id;
                let delivery_default = address.is_delivery_default;
                let billing_default = address.is_billing_default;
                addresses.retain(|a| a.id != id);
                addresses.push(address);
                if delivery_default {
                    apply_default(&mut addresses, id, AddressKind::Delivery)?;
                }
                if billing_default {
                    apply_default(&mut addresses, id, AddressKind::Billing)?;
                }
                let next = AddressStep {
                    addresses,
                    selected: Some(id),
                    must_create_address: false,
                    pending_draft: None,
                    last_error: None,
                    loading: false,
                    creating: false,
                };
                self.enter_payment(&next)
            }
            Event::AddressCreationFailed(err) if step.creating => {
                let next = AddressStep {
                    creating: false,
                    last_error: Some(err),
                    ..step.clone()
                };
                Ok(self.goto(Step::Address(next), vec![]))
            }
            Event::ConfirmAddress => {
                if let Some(busy) = step.busy() {
                    return Err(busy);
                }
                self.enter_payment(step)
            }
            _ => Err(CheckoutError::InvalidTransition {
                state: "ADDRESS",
                event: event_name,
            }),
        }
    }

    fn enter_payment(&self, step: &AddressStep) -> Result<Transition, CheckoutError> {
        let id = step.selected.ok_or(CheckoutError::NoAddressSelected)?;
        let address = step
            .selected_address()
            .cloned()
            .ok_or(CheckoutError::UnknownAddress(id))?;
        let payment = PaymentStep {
            addresses: step.addresses.clone(),
            address,
            shipping: ShippingOption::default(),
            last_selection: None,
            last_error: None,
        };
        Ok(self.goto(Step::Payment(payment), vec![]))
    }

    fn on_payment(&self, step: &PaymentStep, event: Event) -> Result<Transition, CheckoutError> {
        match event {
            Event::ChooseShipping(shipping) => {
                let next = PaymentStep {
                    shipping,
                    ..step.clone()
                };
                Ok(self.goto(Step::Payment(next), vec![]))
            }
            Event::Back => {
                let next = AddressStep {
                    addresses: step.addresses.clone(),
                    selected: Some(step.address.id),
                    ..AddressStep::default()
                };
                Ok(self.goto(Step::Address(next), vec![]))
            }
            Event::Submit(selection) => {
                selection.validate()?;
                let mut order = NewOrder {
                    idempotency_key: Uuid::nil(),
                    address_id: step.address.id,
                    shipping_value: step.shipping.value(),
                    items: self.items.clone(),
                    payment: selection.clone(),
                };
                order.idempotency_key = self.submission_key(&order);
                let next = PaymentStep {
                    last_selection: Some(selection),
                    last_error: None,
                    ..step.clone()
                };
                Ok(self.goto(Step::Submitting(next), vec![Effect::SubmitOrder(order)]))
            }
            other => Err(CheckoutError::InvalidTransition {
                state: "PAYMENT",
                event: other.name(),
            }),
        }
    }

    fn session_expired(&self) -> Transition {
        self.goto(Step::Cart, vec![Effect::EndSession])
    }

    fn goto(&self, step: Step, effects: Vec<Effect>) -> Transition {
        self.with(step, self.items.clone(), effects)
    }

    fn with(&self, step: Step, items: Vec<NewOrderItem>, effects: Vec<Effect>) -> Transition {
        Transition {
            state: Self {
                step,
                items,
                idempotency_key: self.idempotency_key,
            },
            effects,
        }
    }
}

fn is_auth_failure(event: &Event) -> bool {
    match event {
        Event::AddressesFailed(err)
        | Event::AddressCreationFailed(err)
        | Event::SubmissionFailed(err) => err.class == ErrorClass::Auth,
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::{Money, OrderId, OrderItem, OrderStatus, PaymentMethod, ProductId};

    fn items() -> Vec<NewOrderItem> {
        vec![NewOrderItem {
            product_id: ProductId::new(1),
            quantity: 2,
        }]
    }

    fn key() -> Uuid {
        Uuid::from_u128(42)
    }

    fn address(id: i64, delivery_default: bool) -> Address {
        Address {
            id: AddressId::new(id),
            label: format!("Endereço {id}"),
            street: "Rua A".into(),
            number: "10".into(),
            complement: None,
            district: "Centro".into(),
            city: "Recife".into(),
            state: "PE".into(),
            zip_code: "50000000".into(),
            is_delivery_default: delivery_default,
            is_billing_default: false,
        }
    }

    fn draft() -> AddressDraft {
        AddressDraft {
            label: "Trabalho".into(),
            street: "Av. Brasil".into(),
            number: "100".into(),
            district: "Centro".into(),
            city: "Rio de Janeiro".into(),
            state: "RJ".into(),
            zip_code: "20040-002".into(),
            ..AddressDraft::default()
        }
    }

    fn order() -> Order {
        Order {
            id: OrderId::new(42),
            items: vec![OrderItem::new(ProductId::new(1), "Mesa", 2, Money::from_cents(5_000))],
            address: address(1, true).snapshot(),
            shipping_value: Money::from_cents(1_500),
            total_value: Money::from_cents(11_500),
            payment_method: PaymentMethod::Boleto,
            card_holder_name: None,
            card_last_four_digits: None,
            status: OrderStatus::AwaitingPayment,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn begin() -> Event {
        Event::Begin {
            items: items(),
            idempotency_key: key(),
        }
    }

    fn in_payment() -> Checkout {
        let mut checkout = Checkout::new();
        checkout.apply(begin()).unwrap();
        checkout
            .apply(Event::AddressesLoaded(vec![address(1, true), address(2, false)]))
            .unwrap();
        checkout.apply(Event::ConfirmAddress).unwrap();
        checkout
    }

    fn submitted() -> (Checkout, NewOrder) {
        let mut checkout = in_payment();
        let effects = checkout.apply(Event::Submit(PaymentSelection::boleto())).unwrap();
        let [Effect::SubmitOrder(new_order)] = effects.as_slice() else {
            panic!("expected a single submit effect, got {effects:?}");
        };
        let new_order = new_order.clone();
        (checkout, new_order)
    }

    // ========================================================================
    // CART -> ADDRESS
    // ========================================================================

    #[test]
    fn test_empty_cart_is_refused_without_effects() {
        let checkout = Checkout::new();
        let err = checkout
            .transition(Event::Begin {
                items: vec![],
                idempotency_key: key(),
            })
            .unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);
        assert_eq!(checkout.step(), &Step::Cart);
    }

    #[test]
    fn test_begin_loads_addresses() {
        let mut checkout = Checkout::new();
        let effects = checkout.apply(begin()).unwrap();
        assert_eq!(effects, vec![Effect::LoadAddresses]);
        let Step::Address(step) = checkout.step() else {
            panic!("expected ADDRESS");
        };
        assert!(step.loading);
    }

    #[test]
    fn test_loaded_addresses_preselect_delivery_default() {
        let mut checkout = Checkout::new();
        checkout.apply(begin()).unwrap();
        checkout
            .apply(Event::AddressesLoaded(vec![address(1, false), address(2, true)]))
            .unwrap();
        let Step::Address(step) = checkout.step() else {
            panic!("expected ADDRESS");
        };
        assert_eq!(step.selected, Some(AddressId::new(2)));
        assert!(!step.must_create_address);
    }

    #[test]
    fn test_no_addresses_flags_must_create() {
        let mut checkout = Checkout::new();
        checkout.apply(begin()).unwrap();
        checkout.apply(Event::AddressesLoaded(vec![])).unwrap();
        let Step::Address(step) = checkout.step() else {
            panic!("expected ADDRESS");
        };
        assert!(step.must_create_address);
        assert_eq!(
            checkout.transition(Event::ConfirmAddress).unwrap_err(),
            CheckoutError::NoAddressSelected
        );
    }

    #[test]
    fn test_actions_wait_for_address_list() {
        let mut checkout = Checkout::new();
        checkout.apply(begin()).unwrap();
        assert_eq!(
            checkout.transition(Event::ConfirmAddress).unwrap_err(),
            CheckoutError::AddressesLoading
        );
    }

    // ========================================================================
    // ADDRESS -> PAYMENT
    // ========================================================================

    #[test]
    fn test_select_unknown_address_is_refused() {
        let mut checkout = Checkout::new();
        checkout.apply(begin()).unwrap();
        checkout.apply(Event::AddressesLoaded(vec![address(1, false)])).unwrap();
        let before = checkout.clone();
        assert_eq!(
            checkout.apply(Event::SelectAddress(AddressId::new(9))).unwrap_err(),
            CheckoutError::UnknownAddress(AddressId::new(9))
        );
        assert_eq!(checkout, before);
    }

    #[test]
    fn test_confirm_moves_to_payment_with_standard_shipping() {
        let checkout = in_payment();
        let Step::Payment(step) = checkout.step() else {
            panic!("expected PAYMENT");
        };
        assert_eq!(step.address.id, AddressId::new(1));
        assert_eq!(step.shipping, ShippingOption::Standard);
    }

    #[test]
    fn test_invalid_draft_stays_in_address_without_effects() {
        let mut checkout = Checkout::new();
        checkout.apply(begin()).unwrap();
        checkout.apply(Event::AddressesLoaded(vec![])).unwrap();
        let mut bad = draft();
        bad.city = " ".into();
        let err = checkout.apply(Event::CreateAddress(bad)).unwrap_err();
        assert_eq!(err, CheckoutError::Address(AddressError::MissingField("city")));
        assert_eq!(checkout.step().name(), "ADDRESS");
    }

    #[test]
    fn test_created_address_is_selected_and_advances() {
        let mut checkout = Checkout::new();
        checkout.apply(begin()).unwrap();
        checkout.apply(Event::AddressesLoaded(vec![address(1, true)])).unwrap();

        let effects = checkout.apply(Event::CreateAddress(draft())).unwrap();
        let [Effect::CreateAddress(sent)] = effects.as_slice() else {
            panic!("expected create effect");
        };
        assert_eq!(sent.zip_code, "20040002");
        assert_eq!(
            checkout.transition(Event::CreateAddress(draft())).unwrap_err(),
            CheckoutError::AddressCreationInFlight
        );

        let mut created = address(7, true);
        created.label = "Trabalho".into();
        checkout.apply(Event::AddressCreated(created)).unwrap();
        let Step::Payment(step) = checkout.step() else {
            panic!("expected PAYMENT");
        };
        assert_eq!(step.address.id, AddressId::new(7));
        let defaults = step.addresses.iter().filter(|a| a.is_delivery_default).count();
        assert_eq!(defaults, 1);
    }

    #[test]
    fn test_failed_creation_keeps_draft_and_error() {
        let mut checkout = Checkout::new();
        checkout.apply(begin()).unwrap();
        checkout.apply(Event::AddressesLoaded(vec![])).unwrap();
        checkout.apply(Event::CreateAddress(draft())).unwrap();
        checkout
            .apply(Event::AddressCreationFailed(ApiError::new(
                ErrorClass::Server,
                "boom",
            )))
            .unwrap();
        let Step::Address(step) = checkout.step() else {
            panic!("expected ADDRESS");
        };
        assert!(!step.creating);
        assert!(step.pending_draft.is_some());
        assert!(step.addresses.is_empty());
        assert_eq!(checkout.last_error().unwrap().class, ErrorClass::Server);
    }

    // ========================================================================
    // PAYMENT -> CONFIRMATION
    // ========================================================================

    #[test]
    fn test_short_card_number_blocks_locally() {
        let checkout = in_payment();
        let selection = PaymentSelection::card("ANA", "1234 5678 9012 345", "01", "2030", "123");
        assert_eq!(
            checkout.transition(Event::Submit(selection)).unwrap_err(),
            CheckoutError::Payment(PaymentError::InvalidCardNumber)
        );
    }

    #[test]
    fn test_submit_builds_order_request() {
        let (checkout, new_order) = submitted();
        assert!(checkout.is_submitting());
        assert_eq!(new_order.items, items());
        assert_eq!(new_order.address_id, AddressId::new(1));
        assert_eq!(new_order.shipping_value, Money::from_cents(1_500));
        assert_eq!(new_order.idempotency_key, checkout.submission_key(&new_order));
        assert_ne!(new_order.idempotency_key, key());
    }

    #[test]
    fn test_second_submit_while_in_flight_is_refused() {
        let (checkout, _) = submitted();
        assert_eq!(
            checkout
                .transition(Event::Submit(PaymentSelection::boleto()))
                .unwrap_err(),
            CheckoutError::SubmissionInFlight
        );
        assert_eq!(checkout.transition(Event::Back).unwrap_err(), CheckoutError::SubmissionInFlight);
    }

    #[test]
    fn test_success_clears_cart_once() {
        let (mut checkout, _) = submitted();
        let effects = checkout.apply(Event::OrderPlaced(order())).unwrap();
        assert_eq!(effects, vec![Effect::ClearCart]);
        assert_eq!(checkout.order().unwrap().total_value, Money::from_cents(11_500));
        assert!(checkout.is_finished());
        assert!(checkout.transition(Event::OrderPlaced(order())).is_err());
    }

    #[test]
    fn test_failure_returns_to_payment_with_same_key() {
        let (mut checkout, first) = submitted();
        let effects = checkout
            .apply(Event::SubmissionFailed(ApiError::timeout()))
            .unwrap();
        assert!(effects.is_empty());
        let Step::Payment(step) = checkout.step() else {
            panic!("expected PAYMENT");
        };
        assert_eq!(step.last_selection, Some(PaymentSelection::boleto()));
        assert_eq!(checkout.last_error().unwrap().class, ErrorClass::Network);

        let effects = checkout.apply(Event::Submit(PaymentSelection::boleto())).unwrap();
        let [Effect::SubmitOrder(retry)] = effects.as_slice() else {
            panic!("expected submit effect");
        };
        assert_eq!(retry.idempotency_key, first.idempotency_key);
    }

    #[test]
    fn test_changed_order_after_failure_gets_new_key() {
        let (mut checkout, first) = submitted();
        checkout
            .apply(Event::SubmissionFailed(ApiError::timeout()))
            .unwrap();

        let more = vec![NewOrderItem {
            product_id: ProductId::new(1),
            quantity: 5,
        }];
        checkout.apply(Event::CartChanged(more.clone())).unwrap();
        let effects = checkout.apply(Event::Submit(PaymentSelection::boleto())).unwrap();
        let [Effect::SubmitOrder(changed)] = effects.as_slice() else {
            panic!("expected submit effect");
        };
        assert_eq!(changed.items, more);
        assert_ne!(changed.idempotency_key, first.idempotency_key);

        // Going back to the original cart reuses the original key.
        checkout
            .apply(Event::SubmissionFailed(ApiError::timeout()))
            .unwrap();
        checkout.apply(Event::CartChanged(items())).unwrap();
        let effects = checkout.apply(Event::Submit(PaymentSelection::boleto())).unwrap();
        let [Effect::SubmitOrder(again)] = effects.as_slice() else {
            panic!("expected submit effect");
        };
        assert_eq!(again.idempotency_key, first.idempotency_key);
    }

    #[test]
    fn test_changed_shipping_after_failure_gets_new_key() {
        let (mut checkout, first) = submitted();
        checkout
            .apply(Event::SubmissionFailed(ApiError::timeout()))
            .unwrap();
        checkout.apply(Event::ChooseShipping(ShippingOption::Express)).unwrap();
        let effects = checkout.apply(Event::Submit(PaymentSelection::boleto())).unwrap();
        let [Effect::SubmitOrder(changed)] = effects.as_slice() else {
            panic!("expected submit effect");
        };
        assert_ne!(changed.idempotency_key, first.idempotency_key);
    }

    #[test]
    fn test_shipping_choice_is_submitted() {
        let mut checkout = in_payment();
        checkout.apply(Event::ChooseShipping(ShippingOption::Express)).unwrap();
        let effects = checkout.apply(Event::Submit(PaymentSelection::boleto())).unwrap();
        let [Effect::SubmitOrder(new_order)] = effects.as_slice() else {
            panic!("expected submit effect");
        };
        assert_eq!(new_order.shipping_value, Money::from_cents(3_000));
    }

    #[test]
    fn test_back_keeps_selection() {
        let mut checkout = in_payment();
        checkout.apply(Event::Back).unwrap();
        let Step::Address(step) = checkout.step() else {
            panic!("expected ADDRESS");
        };
        assert_eq!(step.selected, Some(AddressId::new(1)));
        assert_eq!(step.addresses.len(), 2);
    }

    // ========================================================================
    // Auth failures and aborts
    // ========================================================================

    #[test]
    fn test_auth_failure_restarts_at_cart() {
        let (mut checkout, _) = submitted();
        let effects = checkout
            .apply(Event::SubmissionFailed(ApiError::new(ErrorClass::Auth, "expired")))
            .unwrap();
        assert_eq!(effects, vec![Effect::EndSession]);
        assert_eq!(checkout.step(), &Step::Cart);
        assert_eq!(checkout.items(), items().as_slice());
    }

    #[test]
    fn test_emptied_cart_aborts() {
        let mut checkout = in_payment();
        checkout.apply(Event::CartChanged(vec![])).unwrap();
        assert_eq!(checkout.step(), &Step::Aborted);
        assert!(checkout.apply(begin()).is_ok());
    }

    #[test]
    fn test_cart_change_updates_items() {
        let mut checkout = in_payment();
        let more = vec![NewOrderItem {
            product_id: ProductId::new(3),
            quantity: 1,
        }];
        checkout.apply(Event::CartChanged(more.clone())).unwrap();
        assert_eq!(checkout.items(), more.as_slice());
        assert_eq!(checkout.step().name(), "PAYMENT");
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(CheckoutError::EmptyCart.class(), ErrorClass::Validation);
        assert_eq!(CheckoutError::SubmissionInFlight.class(), ErrorClass::Conflict);
        assert_eq!(
            CheckoutError::Api(ApiError::network("down")).class(),
            ErrorClass::Network
        );
    }
}
