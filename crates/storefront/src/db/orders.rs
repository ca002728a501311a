//! Order repository.
//!
//! An order row and its items are written in one transaction. The
//! `(customer_id, idempotency_key)` unique constraint makes a repeated
//! submission find the order the first one created, stored together with
//! the fingerprint of the request that created it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use deskly_core::{
    AddressId, AddressSnapshot, CustomerId, Money, Order, OrderId, OrderItem, OrderStatus,
    PaymentMethod, PricedOrder, ProductId, ValidatedPayment,
};

use super::{RepositoryError, to_u32};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: CustomerId,
    address_label: String,
    address_street: String,
    address_number: String,
    address_complement: Option<String>,
    address_district: String,
    address_city: String,
    address_state: String,
    address_zip_code: String,
    shipping_value: Money,
    total_value: Money,
    payment_method: PaymentMethod,
    card_holder_name: Option<String>,
    card_last_four_digits: Option<String>,
    status: OrderStatus,
    request_fingerprint: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    unit_price: Money,
    subtotal: Money,
}

impl OrderItemRow {
    fn into_item(self) -> Result<OrderItem, RepositoryError> {
        Ok(OrderItem {
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: to_u32(self.quantity, "quantity")?,
            unit_price: self.unit_price,
            subtotal: self.subtotal,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            items,
            address: AddressSnapshot {
                label: self.address_label,
                street: self.address_street,
                number: self.address_number,
                complement: self.address_complement,
                district: self.address_district,
                city: self.address_city,
                state: self.address_state,
                zip_code: self.address_zip_code,
            },
            shipping_value: self.shipping_value,
            total_value: self.total_value,
            payment_method: self.payment_method,
            card_holder_name: self.card_holder_name,
            card_last_four_digits: self.card_last_four_digits,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const ORDER_COLUMNS: &str = "id, customer_id, address_label, address_street, address_number, \
     address_complement, address_district, address_city, address_state, address_zip_code, \
     shipping_value, total_value, payment_method, card_holder_name, card_last_four_digits, \
     status, request_fingerprint, created_at, updated_at";

/// An order found by idempotency key.
#[derive(Debug, Clone)]
pub struct KeyedOrder {
    pub order: Order,
    /// [`deskly_core::NewOrder::fingerprint`] of the creating request.
    pub fingerprint: String,
}

/// Result of [`OrderRepository::insert`].
#[derive(Debug)]
pub enum InsertOutcome {
    Created(Order),
    /// The idempotency key was already used; this is the order it created.
    Existing(KeyedOrder),
}

/// Everything needed to write a new order.
pub struct NewOrderRecord<'r> {
    pub customer_id: CustomerId,
    pub idempotency_key: Uuid,
    pub fingerprint: &'r str,
    pub address_id: AddressId,
    pub address: &'r AddressSnapshot,
    pub priced: &'r PricedOrder,
    pub payment: &'r ValidatedPayment,
}

/// Repository for a customer's orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Write an order and its items, unless the idempotency key was used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn insert(&self, record: NewOrderRecord<'_>) -> Result<InsertOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let address = record.address;

        let inserted = sqlx::query_scalar::<_, OrderId>(
            r#"
            INSERT INTO storefront."order"
                (customer_id, idempotency_key, request_fingerprint, address_id,
                 address_label, address_street, address_number, address_complement,
                 address_district, address_city, address_state, address_zip_code,
                 shipping_value, total_value, payment_method,
                 card_holder_name, card_last_four_digits)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (customer_id, idempotency_key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(record.customer_id)
        .bind(record.idempotency_key)
        .bind(record.fingerprint)
        .bind(record.address_id)
        .bind(&address.label)
        .bind(&address.street)
        .bind(&address.number)
        .bind(address.complement.as_deref())
        .bind(&address.district)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip_code)
        .bind(record.priced.shipping_value)
        .bind(record.priced.total_value)
        .bind(record.payment.method())
        .bind(record.payment.card_holder_name())
        .bind(record.payment.card_last_four())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order_id) = inserted else {
            let existing = keyed(&mut tx, record.customer_id, record.idempotency_key)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            tx.commit().await?;
            return Ok(InsertOutcome::Existing(existing));
        };

        for item in &record.priced.items {
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!("quantity out of range: {}", item.quantity))
            })?;
            sqlx::query(
                r"
                INSERT INTO storefront.order_item
                    (order_id, product_id, product_name, quantity, unit_price, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(quantity)
            .bind(item.unit_price)
            .bind(item.subtotal)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"SELECT {ORDER_COLUMNS} FROM storefront."order" WHERE id = $1"#
        ))
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(InsertOutcome::Created(
            row.into_order(record.priced.items.clone()),
        ))
    }

    /// The order a customer already created with `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_by_idempotency_key(
        &self,
        customer_id: CustomerId,
        key: Uuid,
    ) -> Result<Option<KeyedOrder>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        keyed(&mut conn, customer_id, key).await
    }

    /// Get an order and its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<(CustomerId, Order)>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"SELECT {ORDER_COLUMNS} FROM storefront."order" WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let customer_id = row.customer_id;
        let order = with_items(&mut conn, vec![row]).await?.pop();
        Ok(order.map(|o| (customer_id, o)))
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM storefront."order"
            WHERE customer_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

        with_items(&mut conn, rows).await
    }
}

async fn keyed(
    conn: &mut PgConnection,
    customer_id: CustomerId,
    key: Uuid,
) -> Result<Option<KeyedOrder>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r#"
        SELECT {ORDER_COLUMNS} FROM storefront."order"
        WHERE customer_id = $1 AND idempotency_key = $2
        "#
    ))
    .bind(customer_id)
    .bind(key)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let fingerprint = row.request_fingerprint.clone();
    Ok(with_items(conn, vec![row])
        .await?
        .pop()
        .map(|order| KeyedOrder { order, fingerprint }))
}

/// Attach items to order rows, keeping the rows' order.
async fn with_items(
    conn: &mut PgConnection,
    rows: Vec<OrderRow>,
) -> Result<Vec<Order>, RepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = rows.iter().map(|r| r.id.as_i64()).collect();
    let item_rows = sqlx::query_as::<_, OrderItemRow>(
        r"
        SELECT order_id, product_id, product_name, quantity, unit_price, subtotal
        FROM storefront.order_item
        WHERE order_id = ANY($1)
        ORDER BY id
        ",
    )
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for row in item_rows {
        let order_id = row.order_id;
        items.entry(order_id).or_default().push(row.into_item()?);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let lines = items.remove(&row.id).unwrap_or_default();
            row.into_order(lines)
        })
        .collect())
}
