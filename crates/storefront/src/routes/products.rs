//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, State},
};

use deskly_core::{Product, ProductId, ShippingOption, ShippingQuote};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Active products, by name.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list_active().await?;
    Ok(Json(products))
}

/// A product by ID. Inactive products are still returned so that carts
/// holding them can show why checkout fails.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))
}

/// The fixed shipping options.
pub async fn shipping_options() -> Json<Vec<ShippingQuote>> {
    Json(ShippingOption::ALL.into_iter().map(ShippingOption::quote).collect())
}
