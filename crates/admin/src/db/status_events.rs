//! Order status audit trail.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use deskly_core::{BackofficeUserId, OrderId, OrderStatus, StatusChange};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct StatusEventRow {
    order_id: OrderId,
    from_status: OrderStatus,
    to_status: OrderStatus,
    changed_by: Option<String>,
    changed_at: DateTime<Utc>,
}

impl From<StatusEventRow> for StatusChange {
    fn from(row: StatusEventRow) -> Self {
        Self {
            order_id: row.order_id,
            from_status: row.from_status,
            to_status: row.to_status,
            changed_by: row.changed_by,
            changed_at: row.changed_at,
        }
    }
}

/// Repository for status change events.
pub struct StatusEventRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatusEventRepository<'a> {
    /// Create a new status event repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Status changes of an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_order(&self, order_id: OrderId) -> Result<Vec<StatusChange>, RepositoryError> {
        let rows = sqlx::query_as::<_, StatusEventRow>(
            r"
            SELECT e.order_id, e.from_status, e.to_status, u.email AS changed_by, e.changed_at
            FROM admin.order_status_event e
            LEFT JOIN admin.backoffice_user u ON u.id = e.changed_by
            WHERE e.order_id = $1
            ORDER BY e.changed_at, e.id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(StatusChange::from).collect())
    }
}

/// Append an event inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn record(
    conn: &mut PgConnection,
    order_id: OrderId,
    from: OrderStatus,
    to: OrderStatus,
    changed_by: BackofficeUserId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO admin.order_status_event (order_id, from_status, to_status, changed_by)
        VALUES ($1, $2, $3, $4)
        ",
    )
    .bind(order_id)
    .bind(from)
    .bind(to)
    .bind(changed_by)
    .execute(conn)
    .await?;
    Ok(())
}
