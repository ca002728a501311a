//! Backoffice user repository.

use sqlx::PgPool;

use deskly_core::{BackofficeRole, BackofficeUser, BackofficeUserId, Email};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct BackofficeUserRow {
    id: BackofficeUserId,
    email: String,
    name: String,
    role: BackofficeRole,
}

impl TryFrom<BackofficeUserRow> for BackofficeUser {
    type Error = RepositoryError;

    fn try_from(row: BackofficeUserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            name: row.name,
            role: row.role,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: BackofficeUserRow,
    password_hash: String,
}

/// Repository for backoffice operators.
pub struct BackofficeUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BackofficeUserRepository<'a> {
    /// Create a new backoffice user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All operators, by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list_all(&self) -> Result<Vec<BackofficeUser>, RepositoryError> {
        let rows = sqlx::query_as::<_, BackofficeUserRow>(
            r"
            SELECT id, email, name, role
            FROM admin.backoffice_user
            ORDER BY email
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get an operator by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(
        &self,
        id: BackofficeUserId,
    ) -> Result<Option<BackofficeUser>, RepositoryError> {
        let row = sqlx::query_as::<_, BackofficeUserRow>(
            r"
            SELECT id, email, name, role
            FROM admin.backoffice_user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an operator and their password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(BackofficeUser, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, email, name, role, password_hash
            FROM admin.backoffice_user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((r.user.try_into()?, r.password_hash)))
            .transpose()
    }

    /// Create an operator.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        role: BackofficeRole,
        password_hash: &str,
    ) -> Result<BackofficeUser, RepositoryError> {
        let row = sqlx::query_as::<_, BackofficeUserRow>(
            r"
            INSERT INTO admin.backoffice_user (email, name, role, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, role
            ",
        )
        .bind(email.as_str())
        .bind(name)
        .bind(role)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "email already exists"))?;

        row.try_into()
    }
}
