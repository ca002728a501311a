//! Customer repository.

use sqlx::PgPool;

use deskly_core::{CustomerId, CustomerProfile, Email};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    email: String,
    name: String,
}

impl TryFrom<CustomerRow> for CustomerProfile {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            email,
            name: row.name,
        })
    }
}

/// Repository for customer accounts.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: CustomerId) -> Result<Option<CustomerProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT id, email, name
            FROM storefront.customer
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(CustomerProfile::try_from).transpose()
    }

    /// Get a customer and their password hash by email, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(CustomerProfile, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, (CustomerId, String, String, String)>(
            r"
            SELECT id, email, name, password_hash
            FROM storefront.customer
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some((id, email, name, password_hash)) => {
                let email = Email::parse(&email).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
                })?;
                Ok(Some((CustomerProfile { id, email, name }, password_hash)))
            }
            None => Ok(None),
        }
    }

    /// Create a customer with a password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<CustomerProfile, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            INSERT INTO storefront.customer (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name
            ",
        )
        .bind(email.as_str())
        .bind(name)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "email already exists"))?;

        CustomerProfile::try_from(row)
    }
}
