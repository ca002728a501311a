//! Order repository for the backoffice.
//!
//! Reads every customer's orders and changes their status. Status writes
//! happen inside a transaction opened by the lifecycle service, which
//! first locks the row with [`lock_status`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use deskly_core::{
    AddressSnapshot, Money, Order, OrderId, OrderItem, OrderStatus, Page, PageRequest,
    PaymentMethod, ProductId,
};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
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
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
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

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    unit_price: Money,
    subtotal: Money,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative quantity: {}", row.quantity))
        })?;
        Ok(Self {
            product_id: row.product_id,
            product_name: row.product_name,
            quantity,
            unit_price: row.unit_price,
            subtotal: row.subtotal,
        })
    }
}

const ORDER_COLUMNS: &str = "id, address_label, address_street, address_number, \
     address_complement, address_district, address_city, address_state, address_zip_code, \
     shipping_value, total_value, payment_method, card_holder_name, card_last_four_digits, \
     status, created_at, updated_at";

/// Repository for orders across all customers.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_paged(&self, request: PageRequest) -> Result<Page<Order>, RepositoryError> {
        let request = request.clamped();
        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM storefront."order""#)
            .fetch_one(&mut *conn)
            .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM storefront."order"
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(&mut *conn)
        .await?;

        let orders = with_items(&mut conn, rows).await?;
        let total = u64::try_from(total)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative count: {total}")))?;
        Ok(Page::new(orders, request, total))
    }

    /// Get an order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        get_on(&mut conn, id).await
    }
}

/// Load an order on an existing connection or transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn get_on(conn: &mut PgConnection, id: OrderId) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r#"SELECT {ORDER_COLUMNS} FROM storefront."order" WHERE id = $1"#
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    Ok(with_items(conn, vec![row]).await?.pop())
}

/// Lock an order row for the rest of the transaction and return its status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_status(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<OrderStatus>, RepositoryError> {
    let status = sqlx::query_scalar::<_, OrderStatus>(
        r#"SELECT status FROM storefront."order" WHERE id = $1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(status)
}

/// Write a new status.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order does not exist.
pub async fn set_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r#"
        UPDATE storefront."order"
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
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
        items.entry(row.order_id).or_default().push(row.try_into()?);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let lines = items.remove(&row.id).unwrap_or_default();
            row.into_order(lines)
        })
        .collect())
}
