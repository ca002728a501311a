//! Order management route handlers.
//!
//! Reads are open to every role; status changes require a role that
//! [`can_update_orders`](deskly_core::BackofficeRole::can_update_orders).

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use deskly_core::{Order, OrderId, Page, PageRequest, StatusChange, StatusUpdate};

use super::ApiJson;
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireOrderWriter};
use crate::state::AppState;

/// All orders, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<Order>>> {
    let orders = OrderRepository::new(state.pool()).list_paged(page).await?;
    Ok(Json(orders))
}

/// Order detail.
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
}

/// Set an order's status.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireOrderWriter(admin): RequireOrderWriter,
    Path(id): Path<OrderId>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = state
        .lifecycle()
        .update_status(id, update.status, admin.id)
        .await?;
    Ok(Json(order))
}

/// Re-approve a rejected order.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn reapprove(
    State(state): State<AppState>,
    RequireOrderWriter(admin): RequireOrderWriter,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = state.lifecycle().reapprove(id, admin.id).await?;
    Ok(Json(order))
}

/// Status change history, oldest first.
pub async fn history(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Vec<StatusChange>>> {
    let changes = state.lifecycle().history(id).await?;
    Ok(Json(changes))
}
