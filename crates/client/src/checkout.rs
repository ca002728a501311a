//! Async driver for the checkout state machine.
//!
//! [`CheckoutOrchestrator`] feeds user actions into
//! [`deskly_core::checkout::Checkout`], performs the effects it asks for
//! against the [`StorefrontApi`], and feeds the results back in. Each
//! public method runs until the machine has no effects left.

use std::collections::VecDeque;
use std::time::Duration;

use deskly_core::checkout::{Checkout, CheckoutError, Effect, Event, Step};
use deskly_core::{
    AddressDraft, AddressId, ApiError, Cart, CartError, ErrorClass, Order, PaymentSelection,
    ShippingOption,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api::StorefrontApi;
use crate::session::CustomerSession;

/// One checkout over a borrowed customer session.
///
/// The mutable borrow means a session runs at most one checkout, and every
/// method takes `&mut self`, so a second submission cannot start while the
/// first is awaited. If a call is cancelled mid-request, the next call
/// treats the interrupted request as a network failure before going on.
/// Resubmitting the same order reuses its idempotency key; changing the
/// cart, address, shipping or payment method first submits under a new one.
pub struct CheckoutOrchestrator<'s, A> {
    session: &'s mut CustomerSession<A>,
    machine: Checkout,
    submit_timeout: Duration,
}

impl<'s, A: StorefrontApi> CheckoutOrchestrator<'s, A> {
    pub fn new(session: &'s mut CustomerSession<A>, submit_timeout: Duration) -> Self {
        Self {
            session,
            machine: Checkout::new(),
            submit_timeout,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &Checkout {
        &self.machine
    }

    #[must_use]
    pub const fn step(&self) -> &Step {
        self.machine.step()
    }

    #[must_use]
    pub fn cart(&self) -> &Cart {
        self.session.cart()
    }

    /// Bound for later submissions, e.g. a longer one after a timeout.
    pub const fn set_submit_timeout(&mut self, submit_timeout: Duration) {
        self.submit_timeout = submit_timeout;
    }

    /// Enter checkout and load the customer's addresses.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::EmptyCart`] before any request if the cart is
    /// empty; an `Auth` error if the session is logged out; otherwise the
    /// address request failure (the machine stays in ADDRESS).
    #[instrument(skip(self))]
    pub async fn begin(&mut self) -> Result<(), CheckoutError> {
        let event = Event::Begin {
            items: self.session.cart().order_items(),
            idempotency_key: Uuid::new_v4(),
        };
        let transition = self.machine.transition(event)?;
        if !self.session.is_logged_in() {
            return Err(ApiError::new(ErrorClass::Auth, "login required").into());
        }
        self.machine = transition.state;
        info!(idempotency_key = %self.machine.idempotency_key(), "Checkout started");
        self.run(transition.effects).await
    }

    /// # Errors
    ///
    /// Returns the address request failure.
    pub async fn reload_addresses(&mut self) -> Result<(), CheckoutError> {
        self.recover_interrupted()?;
        self.dispatch(Event::ReloadAddresses).await
    }

    /// # Errors
    ///
    /// [`CheckoutError::UnknownAddress`] if `id` is not in the loaded list.
    pub async fn select_address(&mut self, id: AddressId) -> Result<(), CheckoutError> {
        self.recover_interrupted()?;
        self.dispatch(Event::SelectAddress(id)).await
    }

    /// Create an address, select it and move on to PAYMENT.
    ///
    /// # Errors
    ///
    /// A validation error before any request, or the creation failure. In
    /// both cases the machine stays in ADDRESS.
    pub async fn create_address(&mut self, draft: AddressDraft) -> Result<(), CheckoutError> {
        self.recover_interrupted()?;
        self.dispatch(Event::CreateAddress(draft)).await
    }

    /// Move from ADDRESS to PAYMENT with the selected address.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NoAddressSelected`] when nothing is selected.
    pub async fn confirm_address(&mut self) -> Result<(), CheckoutError> {
        self.recover_interrupted()?;
        self.dispatch(Event::ConfirmAddress).await
    }

    /// # Errors
    ///
    /// Refused outside PAYMENT.
    pub async fn choose_shipping(&mut self, option: ShippingOption) -> Result<(), CheckoutError> {
        self.recover_interrupted()?;
        self.dispatch(Event::ChooseShipping(option)).await
    }

    /// Return from PAYMENT to ADDRESS.
    ///
    /// # Errors
    ///
    /// Refused outside PAYMENT.
    pub async fn back(&mut self) -> Result<(), CheckoutError> {
        self.recover_interrupted()?;
        self.dispatch(Event::Back).await
    }

    /// Validate the payment locally, then submit the order.
    ///
    /// On success the cart is cleared and the created order returned. On
    /// any failure the cart is untouched and the machine is back in PAYMENT
    /// (or in CART after an `Auth` failure).
    ///
    /// # Errors
    ///
    /// A [`CheckoutError::Payment`] before any request for an invalid
    /// selection, or the classified submission failure.
    #[instrument(skip(self, selection), fields(method = %selection.method))]
    pub async fn submit(&mut self, selection: PaymentSelection) -> Result<Order, CheckoutError> {
        self.recover_interrupted()?;
        self.dispatch(Event::Submit(selection)).await?;
        self.machine
            .order()
            .cloned()
            .ok_or(CheckoutError::InvalidTransition {
                state: self.machine.step().name(),
                event: "Submit",
            })
    }

    /// Change the cart during checkout. Emptying it aborts the checkout.
    ///
    /// # Errors
    ///
    /// The closure's [`CartError`], or a refusal while a request is pending.
    pub fn modify_cart<R>(
        &mut self,
        change: impl FnOnce(&mut Cart) -> Result<R, CartError>,
    ) -> Result<R, CheckoutError> {
        self.recover_interrupted()?;
        let result = change(self.session.cart_mut())?;
        if !self.machine.is_finished() {
            let items = self.session.cart().order_items();
            self.machine.apply(Event::CartChanged(items))?;
        }
        Ok(result)
    }

    /// Leave checkout. Nothing is undone on the server since no order exists.
    ///
    /// # Errors
    ///
    /// Refused once the checkout is finished.
    pub fn abandon(&mut self) -> Result<(), CheckoutError> {
        self.recover_interrupted()?;
        self.machine.apply(Event::Abandon)?;
        Ok(())
    }

    /// Settle a request that was in flight when a previous call was
    /// cancelled.
    fn recover_interrupted(&mut self) -> Result<(), CheckoutError> {
        let interrupted = || ApiError::network("previous request was interrupted");
        let event = match self.machine.step() {
            Step::Submitting(_) => Event::SubmissionFailed(interrupted()),
            Step::Address(step) if step.creating => Event::AddressCreationFailed(interrupted()),
            Step::Address(step) if step.loading => Event::AddressesFailed(interrupted()),
            _ => return Ok(()),
        };
        warn!(step = self.machine.step().name(), "Recovering interrupted request");
        self.machine.apply(event)?;
        Ok(())
    }

    async fn dispatch(&mut self, event: Event) -> Result<(), CheckoutError> {
        let effects = self.machine.apply(event)?;
        self.run(effects).await
    }

    /// Run effects until none are left. Returns the first collaborator
    /// failure, after the machine has recorded it.
    async fn run(&mut self, effects: Vec<Effect>) -> Result<(), CheckoutError> {
        let mut queue = VecDeque::from(effects);
        let mut failure = None;

        while let Some(effect) = queue.pop_front() {
            let Some(event) = self.perform(effect).await else {
                continue;
            };
            if let Event::AddressesFailed(err)
            | Event::AddressCreationFailed(err)
            | Event::SubmissionFailed(err) = &event
            {
                failure.get_or_insert_with(|| err.clone());
            }
            queue.extend(self.machine.apply(event)?);
        }

        failure.map_or(Ok(()), |err| Err(CheckoutError::Api(err)))
    }

    async fn perform(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::LoadAddresses => Some(match self.session.api().list_addresses().await {
                Ok(addresses) => Event::AddressesLoaded(addresses),
                Err(err) => Event::AddressesFailed(err),
            }),
            Effect::CreateAddress(draft) => {
                Some(match self.session.api().create_address(&draft).await {
                    Ok(address) => Event::AddressCreated(address),
                    Err(err) => Event::AddressCreationFailed(err),
                })
            }
            Effect::SubmitOrder(order) => {
                let request = self.session.api().submit_order(&order);
                Some(match tokio::time::timeout(self.submit_timeout, request).await {
                    Ok(Ok(created)) => {
                        info!(order_id = %created.id, total = %created.total_value, "Order placed");
                        Event::OrderPlaced(created)
                    }
                    Ok(Err(err)) => {
                        warn!(error = %err, "Order submission failed");
                        Event::SubmissionFailed(err)
                    }
                    Err(_) => {
                        warn!(timeout = ?self.submit_timeout, "Order submission timed out");
                        Event::SubmissionFailed(ApiError::timeout())
                    }
                })
            }
            Effect::ClearCart => {
                self.session.cart_mut().clear();
                None
            }
            Effect::EndSession => {
                self.session.expire();
                None
            }
        }
    }
}
