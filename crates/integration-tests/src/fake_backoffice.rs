//! In-memory backoffice applying the transition policy and role checks.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use deskly_client::BackofficeApi;
use deskly_core::{
    ApiError, BackofficeRole, BackofficeUser, BackofficeUserId, Email, Order, OrderId,
    OrderStatus, Page, PageRequest, StatusChange, TransitionError, TransitionPolicy,
};
use secrecy::{ExposeSecret, SecretString};

use crate::{PASSWORD, http_error};

#[derive(Default)]
struct State {
    operators: Vec<BackofficeUser>,
    current: Option<BackofficeUser>,
    orders: Vec<Order>,
    history: Vec<StatusChange>,
    policy: TransitionPolicy,
    next_id: i64,
    failures: VecDeque<ApiError>,
}

impl State {
    fn writer(&self) -> Result<&BackofficeUser, ApiError> {
        let user = self
            .current
            .as_ref()
            .ok_or_else(|| http_error(401, "authentication required"))?;
        if !user.role.can_update_orders() {
            return Err(http_error(403, "role cannot change orders"));
        }
        Ok(user)
    }

    fn reader(&self) -> Result<(), ApiError> {
        self.current
            .as_ref()
            .map(|_| ())
            .ok_or_else(|| http_error(401, "authentication required"))
    }

    /// Lock, decide and record, like the admin's lifecycle service.
    fn apply(
        &mut self,
        id: OrderId,
        decide: impl FnOnce(OrderStatus) -> Result<OrderStatus, TransitionError>,
    ) -> Result<Order, ApiError> {
        let changed_by = self.writer()?.email.to_string();
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| http_error(404, "order not found"))?;

        let from = order.status;
        let to = decide(from).map_err(|e| http_error(409, &e.to_string()))?;
        if from != to {
            let now = Utc::now();
            order.status = to;
            order.updated_at = now;
            let updated = order.clone();
            self.history.push(StatusChange {
                order_id: id,
                from_status: from,
                to_status: to,
                changed_by: Some(changed_by),
                changed_at: now,
            });
            return Ok(updated);
        }
        Ok(order.clone())
    }
}

/// Backoffice double. Orders are added by the test, typically copied from a
/// [`crate::FakeStorefront`].
#[derive(Clone, Default)]
pub struct FakeBackoffice {
    state: Arc<Mutex<State>>,
}

impl FakeBackoffice {
    #[must_use]
    pub fn new(policy: TransitionPolicy) -> Self {
        let fake = Self::default();
        fake.state().policy = policy;
        fake
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<(), ApiError> {
        match self.state().failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Register an operator whose password is [`PASSWORD`].
    ///
    /// # Panics
    ///
    /// Panics if `email` is not a valid address.
    #[must_use]
    pub fn add_operator(&self, email: &str, name: &str, role: BackofficeRole) -> BackofficeUserId {
        let mut state = self.state();
        state.next_id += 1;
        let id = BackofficeUserId::new(state.next_id);
        state.operators.push(BackofficeUser {
            id,
            email: Email::parse(email).expect("valid test email"),
            name: name.to_owned(),
            role,
        });
        id
    }

    pub fn add_order(&self, order: Order) {
        self.state().orders.push(order);
    }

    #[must_use]
    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.state().orders.iter().find(|o| o.id == id).cloned()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.state().history.len()
    }

    pub fn fail_next(&self, err: ApiError) {
        self.state().failures.push_back(err);
    }

    pub fn expire_session(&self) {
        self.state().current = None;
    }
}

impl BackofficeApi for FakeBackoffice {
    async fn login(&self, email: &str, password: &SecretString) -> Result<BackofficeUser, ApiError> {
        self.begin()?;
        let mut state = self.state();
        let user = state
            .operators
            .iter()
            .find(|u| u.email.as_str() == email && password.expose_secret() == PASSWORD)
            .cloned()
            .ok_or_else(|| http_error(401, "invalid email or password"))?;
        state.current = Some(user.clone());
        Ok(user)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.begin()?;
        self.state().current = None;
        Ok(())
    }

    async fn list_orders_paged(&self, page: PageRequest) -> Result<Page<Order>, ApiError> {
        self.begin()?;
        let state = self.state();
        state.reader()?;

        let page = page.clamped();
        let mut orders = state.orders.clone();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = u64::try_from(orders.len()).unwrap_or(u64::MAX);
        let content = orders
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or_default())
            .collect();
        Ok(Page::new(content, page, total))
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.begin()?;
        let state = self.state();
        state.reader()?;
        state
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| http_error(404, "order not found"))
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, ApiError> {
        self.begin()?;
        let mut state = self.state();
        let policy = state.policy;
        state.apply(id, |from| policy.check(from, status).map(|()| status))
    }

    async fn reapprove(&self, id: OrderId) -> Result<Order, ApiError> {
        self.begin()?;
        self.state().apply(id, |from| {
            TransitionPolicy::check_reapproval(from).map(|()| OrderStatus::PaymentApproved)
        })
    }

    async fn order_history(&self, id: OrderId) -> Result<Vec<StatusChange>, ApiError> {
        self.begin()?;
        let state = self.state();
        state.reader()?;
        if !state.orders.iter().any(|o| o.id == id) {
            return Err(http_error(404, "order not found"));
        }
        Ok(state
            .history
            .iter()
            .filter(|c| c.order_id == id)
            .cloned()
            .collect())
    }
}
