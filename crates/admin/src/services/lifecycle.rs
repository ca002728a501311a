//! Order Lifecycle Manager.
//!
//! Every status change runs in one transaction: lock the order row, check
//! the [`TransitionPolicy`], write the status, append an audit event. The
//! lock serializes concurrent operators acting on the same order.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use deskly_core::{
    BackofficeUserId, Order, OrderId, OrderStatus, StatusChange, TransitionError,
    TransitionPolicy,
};

use crate::db::{RepositoryError, StatusEventRepository, orders, status_events};

/// Why a status change or lookup failed.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for LifecycleError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(err.into())
    }
}

/// Applies status changes under a transition policy.
pub struct OrderLifecycle<'a> {
    pool: &'a PgPool,
    policy: TransitionPolicy,
}

impl<'a> OrderLifecycle<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, policy: TransitionPolicy) -> Self {
        Self { pool, policy }
    }

    /// Set an order's status.
    ///
    /// Setting the current status again is accepted and records nothing.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::OrderNotFound` for an unknown order and
    /// `LifecycleError::Transition` when the policy refuses the change.
    #[instrument(skip(self), fields(policy = ?self.policy))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        to: OrderStatus,
        actor: BackofficeUserId,
    ) -> Result<Order, LifecycleError> {
        let policy = self.policy;
        self.apply(order_id, actor, move |from| {
            policy.check(from, to).map(|()| to)
        })
        .await
    }

    /// Move a rejected order back to `PAGAMENTO_APROVADO`.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::Transition` if the order is not rejected.
    #[instrument(skip(self))]
    pub async fn reapprove(
        &self,
        order_id: OrderId,
        actor: BackofficeUserId,
    ) -> Result<Order, LifecycleError> {
        self.apply(order_id, actor, |from| {
            TransitionPolicy::check_reapproval(from).map(|()| OrderStatus::PaymentApproved)
        })
        .await
    }

    /// An order's status changes, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::OrderNotFound` for an unknown order.
    pub async fn history(&self, order_id: OrderId) -> Result<Vec<StatusChange>, LifecycleError> {
        if orders::OrderRepository::new(self.pool)
            .get(order_id)
            .await?
            .is_none()
        {
            return Err(LifecycleError::OrderNotFound(order_id));
        }
        Ok(StatusEventRepository::new(self.pool)
            .list_for_order(order_id)
            .await?)
    }

    async fn apply(
        &self,
        order_id: OrderId,
        actor: BackofficeUserId,
        decide: impl FnOnce(OrderStatus) -> Result<OrderStatus, TransitionError>,
    ) -> Result<Order, LifecycleError> {
        let mut tx = self.pool.begin().await?;

        let from = orders::lock_status(&mut tx, order_id)
            .await?
            .ok_or(LifecycleError::OrderNotFound(order_id))?;
        let to = decide(from)?;

        if from != to {
            orders::set_status(&mut tx, order_id, to).await?;
            status_events::record(&mut tx, order_id, from, to, actor).await?;
        }

        let order = orders::get_on(&mut tx, order_id)
            .await?
            .ok_or(LifecycleError::OrderNotFound(order_id))?;
        tx.commit().await?;

        if from != to {
            info!(order_id = %order_id, actor = %actor, %from, %to, "Order status changed");
        }
        Ok(order)
    }
}
