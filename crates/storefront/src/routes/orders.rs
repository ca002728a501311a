//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use deskly_core::{NewOrder, Order, OrderId};

use super::ApiJson;
use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::services::{OrderService, Placement};
use crate::state::AppState;

/// Submit an order.
///
/// Responds `201 Created` for a new order and `200 OK` when the same
/// request was already placed under this idempotency key, with the order it
/// created. The key reused for a different order is `409 Conflict`.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    ApiJson(request): ApiJson<NewOrder>,
) -> Result<(StatusCode, Json<Order>)> {
    let outcome = OrderService::new(state.pool())
        .place(customer.id, &request)
        .await?;

    let (status, order) = match outcome {
        Placement::Created(order) => (StatusCode::CREATED, order),
        Placement::Replayed(order) => (StatusCode::OK, order),
    };
    add_breadcrumb(
        "checkout",
        "Order submitted",
        Some(&[("order_id", &order.id.to_string())]),
    );
    Ok((status, Json(order)))
}

/// The customer's orders, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderService::new(state.pool())
        .list_for_customer(customer.id)
        .await?;
    Ok(Json(orders))
}

/// One of the customer's orders.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let (owner, order) = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    if owner != customer.id {
        return Err(AppError::Forbidden(format!(
            "order {id} belongs to another customer"
        )));
    }
    Ok(Json(order))
}
