//! Address repository.
//!
//! Default flags are moved inside a transaction: the old default of a kind is
//! cleared before the new one is set, so the partial unique indexes never
//! see two defaults. A concurrent writer that races us gets a unique
//! violation, reported as `Conflict`.

use sqlx::{PgConnection, PgPool};

use deskly_core::{Address, AddressDraft, AddressId, AddressKind, CustomerId};

use super::RepositoryError;

const DEFAULT_CONFLICT: &str = "another default address was set concurrently";

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    customer_id: CustomerId,
    label: String,
    street: String,
    number: String,
    complement: Option<String>,
    district: String,
    city: String,
    state: String,
    zip_code: String,
    is_delivery_default: bool,
    is_billing_default: bool,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            label: row.label,
            street: row.street,
            number: row.number,
            complement: row.complement,
            district: row.district,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            is_delivery_default: row.is_delivery_default,
            is_billing_default: row.is_billing_default,
        }
    }
}

const COLUMNS: &str = "id, customer_id, label, street, number, complement, district, city, \
                       state, zip_code, is_delivery_default, is_billing_default";

/// Repository for customer addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All addresses of a customer, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, customer_id: CustomerId) -> Result<Vec<Address>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        list_on(&mut conn, customer_id).await
    }

    /// Get an address and its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AddressId) -> Result<Option<(CustomerId, Address)>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {COLUMNS} FROM storefront.address WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.customer_id, Address::from(r))))
    }

    /// Insert a validated draft.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a concurrent request set a
    /// default of the same kind.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        customer_id: CustomerId,
        draft: &AddressDraft,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        clear_defaults_for(&mut tx, customer_id, draft, None).await?;

        let row = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            INSERT INTO storefront.address
                (customer_id, label, street, number, complement, district, city, state,
                 zip_code, is_delivery_default, is_billing_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {COLUMNS}
            "
        ))
        .bind(customer_id)
        .bind(&draft.label)
        .bind(&draft.street)
        .bind(&draft.number)
        .bind(draft.complement.as_deref())
        .bind(&draft.district)
        .bind(&draft.city)
        .bind(&draft.state)
        .bind(&draft.zip_code)
        .bind(draft.is_delivery_default)
        .bind(draft.is_billing_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, DEFAULT_CONFLICT))?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Replace an address's fields with a validated draft.
    ///
    /// Unsetting a default flag simply leaves the customer without a default
    /// of that kind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not exist.
    /// Returns `RepositoryError::Conflict` on a concurrent default change.
    pub async fn update(
        &self,
        id: AddressId,
        customer_id: CustomerId,
        draft: &AddressDraft,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        clear_defaults_for(&mut tx, customer_id, draft, Some(id)).await?;

        let row = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            UPDATE storefront.address
            SET label = $3, street = $4, number = $5, complement = $6, district = $7,
                city = $8, state = $9, zip_code = $10,
                is_delivery_default = $11, is_billing_default = $12,
                updated_at = NOW()
            WHERE id = $1 AND customer_id = $2
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(customer_id)
        .bind(&draft.label)
        .bind(&draft.street)
        .bind(&draft.number)
        .bind(draft.complement.as_deref())
        .bind(&draft.district)
        .bind(&draft.city)
        .bind(&draft.state)
        .bind(&draft.zip_code)
        .bind(draft.is_delivery_default)
        .bind(draft.is_billing_default)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, DEFAULT_CONFLICT))?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Delete an address. Orders keep their own copy.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not exist.
    pub async fn delete(&self, id: AddressId, customer_id: CustomerId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront.address
            WHERE id = $1 AND customer_id = $2
            ",
        )
        .bind(id)
        .bind(customer_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Make `id` the customer's only default of `kind` and return the
    /// customer's full, updated list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not exist.
    /// Returns `RepositoryError::Conflict` on a concurrent default change.
    pub async fn set_default(
        &self,
        id: AddressId,
        customer_id: CustomerId,
        kind: AddressKind,
    ) -> Result<Vec<Address>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        clear_default(&mut tx, customer_id, kind, Some(id)).await?;

        let sql = match kind {
            AddressKind::Delivery => {
                r"
                UPDATE storefront.address
                SET is_delivery_default = TRUE, updated_at = NOW()
                WHERE id = $1 AND customer_id = $2
                "
            }
            AddressKind::Billing => {
                r"
                UPDATE storefront.address
                SET is_billing_default = TRUE, updated_at = NOW()
                WHERE id = $1 AND customer_id = $2
                "
            }
        };
        let result = sqlx::query(sql)
            .bind(id)
            .bind(customer_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_unique_violation(e, DEFAULT_CONFLICT))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let addresses = list_on(&mut tx, customer_id).await?;
        tx.commit().await?;
        Ok(addresses)
    }
}

async fn list_on(
    conn: &mut PgConnection,
    customer_id: CustomerId,
) -> Result<Vec<Address>, RepositoryError> {
    let rows = sqlx::query_as::<_, AddressRow>(&format!(
        "SELECT {COLUMNS} FROM storefront.address WHERE customer_id = $1 ORDER BY id"
    ))
    .bind(customer_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(Address::from).collect())
}

async fn clear_defaults_for(
    conn: &mut PgConnection,
    customer_id: CustomerId,
    draft: &AddressDraft,
    except: Option<AddressId>,
) -> Result<(), RepositoryError> {
    if draft.is_delivery_default {
        clear_default(conn, customer_id, AddressKind::Delivery, except).await?;
    }
    if draft.is_billing_default {
        clear_default(conn, customer_id, AddressKind::Billing, except).await?;
    }
    Ok(())
}

async fn clear_default(
    conn: &mut PgConnection,
    customer_id: CustomerId,
    kind: AddressKind,
    except: Option<AddressId>,
) -> Result<(), RepositoryError> {
    let sql = match kind {
        AddressKind::Delivery => {
            r"
            UPDATE storefront.address
            SET is_delivery_default = FALSE, updated_at = NOW()
            WHERE customer_id = $1 AND is_delivery_default
              AND ($2::BIGINT IS NULL OR id <> $2)
            "
        }
        AddressKind::Billing => {
            r"
            UPDATE storefront.address
            SET is_billing_default = FALSE, updated_at = NOW()
            WHERE customer_id = $1 AND is_billing_default
              AND ($2::BIGINT IS NULL OR id <> $2)
            "
        }
    };
    sqlx::query(sql)
        .bind(customer_id)
        .bind(except)
        .execute(conn)
        .await?;
    Ok(())
}
