//! Order submission.
//!
//! Nothing the client sends about money is trusted: names and prices come
//! from the catalog and totals from [`price_order`]. Payment data is
//! validated again here and reduced to holder name and last four digits.
//!
//! An idempotency key replays the order it created only for a request with
//! the same [`NewOrder::fingerprint`]. Any other request under that key is a
//! conflict.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use deskly_core::{
    AddressId, CustomerId, NewOrder, NewOrderItem, Order, OrderId, PaymentError, PricedLine,
    PricingError, ProductId, check_shipping, price_order,
};

use crate::db::{
    AddressRepository, InsertOutcome, KeyedOrder, NewOrderRecord, OrderRepository,
    ProductRepository, RepositoryError,
};
use crate::error::AppError;

/// Why an order was not placed.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("address {0} not found")]
    AddressNotFound(AddressId),

    #[error("address {0} belongs to another customer")]
    AddressNotOwned(AddressId),

    #[error("product {0} is not available")]
    ProductUnavailable(ProductId),

    #[error("idempotency key was already used for order {0} with different contents")]
    KeyReused(OrderId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Pricing(e) => e.into(),
            OrderError::Payment(e) => e.into(),
            OrderError::AddressNotFound(_) | OrderError::ProductUnavailable(_) => {
                Self::NotFound(err.to_string())
            }
            OrderError::AddressNotOwned(_) => Self::Forbidden(err.to_string()),
            OrderError::KeyReused(_) => Self::Conflict(err.to_string()),
            OrderError::Repository(e) => e.into(),
        }
    }
}

/// Outcome of [`OrderService::place`].
#[derive(Debug)]
pub enum Placement {
    Created(Order),
    /// Same key and same request as an earlier submission.
    Replayed(Order),
}

/// Places orders for a customer.
pub struct OrderService<'a> {
    addresses: AddressRepository<'a>,
    products: ProductRepository<'a>,
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            addresses: AddressRepository::new(pool),
            products: ProductRepository::new(pool),
            orders: OrderRepository::new(pool),
        }
    }

    /// Validate, price and store an order.
    ///
    /// A request repeating an idempotency key the customer already used
    /// returns the order that key created, without re-validating, if it
    /// orders the same thing.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderError`] describing the first problem found.
    #[instrument(
        skip(self, request),
        fields(
            customer_id = %customer_id,
            idempotency_key = %request.idempotency_key,
            method = %request.payment.method,
        )
    )]
    pub async fn place(
        &self,
        customer_id: CustomerId,
        request: &NewOrder,
    ) -> Result<Placement, OrderError> {
        let fingerprint = request.fingerprint();
        if let Some(existing) = self
            .orders
            .find_by_idempotency_key(customer_id, request.idempotency_key)
            .await?
        {
            return replay(existing, &fingerprint).map(Placement::Replayed);
        }

        let items = merge_items(&request.items)?;
        check_shipping(request.shipping_value)?;
        let payment = request.payment.validate()?;

        let (owner, address) = self
            .addresses
            .get(request.address_id)
            .await?
            .ok_or(OrderError::AddressNotFound(request.address_id))?;
        if owner != customer_id {
            return Err(OrderError::AddressNotOwned(request.address_id));
        }

        let ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
        let products = self.products.get_many(&ids).await?;
        let lines = items
            .iter()
            .map(|item| {
                let product = products
                    .iter()
                    .find(|p| p.id == item.product_id && p.active)
                    .ok_or(OrderError::ProductUnavailable(item.product_id))?;
                Ok(PricedLine {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    unit_price: product.price,
                    quantity: item.quantity,
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        let priced = price_order(lines, request.shipping_value)?;
        let snapshot = address.snapshot();

        let outcome = self
            .orders
            .insert(NewOrderRecord {
                customer_id,
                idempotency_key: request.idempotency_key,
                fingerprint: &fingerprint,
                address_id: request.address_id,
                address: &snapshot,
                priced: &priced,
                payment: &payment,
            })
            .await?;

        match outcome {
            InsertOutcome::Created(order) => {
                info!(order_id = %order.id, total = %order.total_value, "Order placed");
                Ok(Placement::Created(order))
            }
            // Lost a race with a concurrent request using the same key.
            InsertOutcome::Existing(existing) => {
                replay(existing, &fingerprint).map(Placement::Replayed)
            }
        }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_customer(customer_id).await?)
    }
}

/// The order an idempotency key created, if `fingerprint` matches the
/// request that created it.
fn replay(existing: KeyedOrder, fingerprint: &str) -> Result<Order, OrderError> {
    if existing.fingerprint == fingerprint {
        info!(order_id = %existing.order.id, "Idempotent replay of order submission");
        Ok(existing.order)
    } else {
        warn!(
            order_id = %existing.order.id,
            "Idempotency key reused for a different order"
        );
        Err(OrderError::KeyReused(existing.order.id))
    }
}

/// Collapse repeated products into one line and check quantities.
fn merge_items(items: &[NewOrderItem]) -> Result<Vec<NewOrderItem>, PricingError> {
    if items.is_empty() {
        return Err(PricingError::EmptyOrder);
    }

    let mut merged: Vec<NewOrderItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 {
            return Err(PricingError::ZeroQuantity(item.product_id));
        }
        match merged.iter_mut().find(|m| m.product_id == item.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => merged.push(*item),
        }
    }
    Ok(merged)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::http::StatusCode;
    use chrono::Utc;
    use deskly_core::{
        AddressSnapshot, Money, OrderItem, OrderStatus, PaymentMethod, PaymentSelection,
    };
    use uuid::Uuid;

    use super::*;

    fn request(quantity: u32) -> NewOrder {
        NewOrder {
            idempotency_key: Uuid::from_u128(7),
            address_id: AddressId::new(3),
            shipping_value: Money::from_cents(1_500),
            items: vec![item(1, quantity)],
            payment: PaymentSelection::boleto(),
        }
    }

    fn stored(created_by: &NewOrder) -> KeyedOrder {
        let unit_price = Money::from_cents(5_000);
        let quantity = created_by.items[0].quantity;
        KeyedOrder {
            order: Order {
                id: OrderId::new(90),
                items: vec![OrderItem::new(ProductId::new(1), "Mesa", quantity, unit_price)],
                address: AddressSnapshot {
                    label: "Casa".into(),
                    street: "Rua A".into(),
                    number: "10".into(),
                    complement: None,
                    district: "Centro".into(),
                    city: "Recife".into(),
                    state: "PE".into(),
                    zip_code: "50000000".into(),
                },
                shipping_value: created_by.shipping_value,
                total_value: unit_price.times(quantity) + created_by.shipping_value,
                payment_method: PaymentMethod::Boleto,
                card_holder_name: None,
                card_last_four_digits: None,
                status: OrderStatus::AwaitingPayment,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            fingerprint: created_by.fingerprint(),
        }
    }

    #[test]
    fn test_replay_returns_order_for_identical_request() {
        let first = request(1);
        let order = replay(stored(&first), &request(1).fingerprint()).unwrap();
        assert_eq!(order.id, OrderId::new(90));
        assert_eq!(order.items[0].quantity, 1);
    }

    #[test]
    fn test_replay_refuses_changed_request_under_same_key() {
        let first = request(1);
        let changed = request(5);
        assert_eq!(changed.idempotency_key, first.idempotency_key);

        let err = replay(stored(&first), &changed.fingerprint()).unwrap_err();
        assert!(matches!(err, OrderError::KeyReused(id) if id == OrderId::new(90)));
        assert_eq!(AppError::from(err).status(), StatusCode::CONFLICT);

        let mut other_shipping = request(1);
        other_shipping.shipping_value = Money::from_cents(3_000);
        assert!(replay(stored(&first), &other_shipping.fingerprint()).is_err());
    }

    fn item(product: i64, quantity: u32) -> NewOrderItem {
        NewOrderItem {
            product_id: ProductId::new(product),
            quantity,
        }
    }

    #[test]
    fn test_merge_items_collapses_duplicates() {
        let merged = merge_items(&[item(1, 2), item(2, 1), item(1, 3)]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].product_id, ProductId::new(1));
        assert_eq!(merged[0].quantity, 5);
        assert_eq!(merged[1].quantity, 1);
    }

    #[test]
    fn test_merge_items_rejects_empty_and_zero() {
        assert_eq!(merge_items(&[]), Err(PricingError::EmptyOrder));
        assert_eq!(
            merge_items(&[item(1, 1), item(7, 0)]),
            Err(PricingError::ZeroQuantity(ProductId::new(7)))
        );
    }

    #[test]
    fn test_order_error_status_mapping() {
        let status = |err: OrderError| AppError::from(err).status();

        assert_eq!(
            status(OrderError::AddressNotFound(AddressId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(OrderError::AddressNotOwned(AddressId::new(1))),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(OrderError::ProductUnavailable(ProductId::new(3))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(OrderError::Payment(PaymentError::InvalidCardNumber)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(OrderError::Pricing(PricingError::EmptyOrder)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(OrderError::Pricing(PricingError::Overflow)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(OrderError::KeyReused(OrderId::new(1))),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_oversized_shipping_is_refused_before_pricing() {
        let huge: Money = serde_json::from_str("\"79228162514264337593543950335\"").unwrap();
        let err = OrderError::from(check_shipping(huge).unwrap_err());
        assert_eq!(AppError::from(err).status(), StatusCode::BAD_REQUEST);
    }
}
