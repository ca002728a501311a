//! Address book route handlers.
//!
//! Every handler is scoped to the logged-in customer. An address owned by
//! someone else is reported as forbidden, an unknown one as not found.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument};

use deskly_core::{Address, AddressDraft, AddressError, AddressId, AddressKind, CustomerId};

use super::ApiJson;
use crate::db::AddressRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

async fn ensure_owner(
    repo: &AddressRepository<'_>,
    id: AddressId,
    customer_id: CustomerId,
) -> Result<()> {
    match repo.get(id).await? {
        None => Err(AddressError::NotFound(id).into()),
        Some((owner, _)) if owner != customer_id => Err(AppError::Forbidden(format!(
            "address {id} belongs to another customer"
        ))),
        Some(_) => Ok(()),
    }
}

/// The customer's addresses.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool()).list(customer.id).await?;
    Ok(Json(addresses))
}

/// Create an address.
#[instrument(skip(state, customer, draft), fields(customer_id = %customer.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    ApiJson(draft): ApiJson<AddressDraft>,
) -> Result<(StatusCode, Json<Address>)> {
    let draft = draft.validate()?;
    let address = AddressRepository::new(state.pool())
        .create(customer.id, &draft)
        .await?;

    info!(address_id = %address.id, "Address created");
    Ok((StatusCode::CREATED, Json(address)))
}

/// Replace an address.
#[instrument(skip(state, customer, draft), fields(customer_id = %customer.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    Path(id): Path<AddressId>,
    ApiJson(draft): ApiJson<AddressDraft>,
) -> Result<Json<Address>> {
    let draft = draft.validate()?;
    let repo = AddressRepository::new(state.pool());
    ensure_owner(&repo, id, customer.id).await?;

    let address = repo.update(id, customer.id, &draft).await?;
    Ok(Json(address))
}

/// Delete an address. Orders placed with it keep their snapshot.
#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    let repo = AddressRepository::new(state.pool());
    ensure_owner(&repo, id, customer.id).await?;

    repo.delete(id, customer.id).await?;
    info!(address_id = %id, "Address deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Make an address the default of `kind` and return the updated list.
#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn set_default(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    Path((id, kind)): Path<(AddressId, AddressKind)>,
) -> Result<Json<Vec<Address>>> {
    let repo = AddressRepository::new(state.pool());
    ensure_owner(&repo, id, customer.id).await?;

    let addresses = repo.set_default(id, customer.id, kind).await?;
    Ok(Json(addresses))
}
