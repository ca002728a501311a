//! Operator authentication service.
//!
//! Operators log in with email and password; accounts are created from the
//! CLI only. Hashes are Argon2id in PHC string format.

mod error;

pub use error::AdminAuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tracing::instrument;

use deskly_core::{BackofficeRole, BackofficeUser, Email};

use crate::db::{BackofficeUserRepository, RepositoryError};

/// Operators hold more privilege than customers, so the floor is higher.
const MIN_PASSWORD_LENGTH: usize = 12;

/// Operator authentication service.
pub struct AdminAuthService<'a> {
    users: BackofficeUserRepository<'a>,
}

impl<'a> AdminAuthService<'a> {
    /// Create a new admin authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: BackofficeUserRepository::new(pool),
        }
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<BackofficeUser, AdminAuthError> {
        let email = Email::parse(email).map_err(|_| AdminAuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AdminAuthError::InvalidCredentials)?;

        verify_password(password.expose_secret(), &password_hash)?;

        Ok(user)
    }

    /// Create an operator account.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AdminAuthError::WeakPassword` if the password is too short.
    /// Returns `AdminAuthError::UserAlreadyExists` if the email is taken.
    #[instrument(skip(self, password), fields(email = %email, role = %role))]
    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        role: BackofficeRole,
        password: &SecretString,
    ) -> Result<BackofficeUser, AdminAuthError> {
        let email = Email::parse(email)?;
        validate_password(password.expose_secret())?;
        let password_hash = hash_password(password.expose_secret())?;

        self.users
            .create(&email, name.trim(), role, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AdminAuthError::UserAlreadyExists,
                other => AdminAuthError::Repository(other),
            })
    }
}

// =============================================================================
// Password Helpers
// =============================================================================

fn validate_password(password: &str) -> Result<(), AdminAuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminAuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AdminAuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AdminAuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AdminAuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AdminAuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AdminAuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_password_floor() {
        assert!(matches!(
            validate_password("eleven-char"),
            Err(AdminAuthError::WeakPassword(_))
        ));
        assert!(validate_password("twelve-chars").is_ok());
    }

    #[test]
    fn test_hash_roundtrip_and_mismatch() {
        let hash = hash_password("operator passphrase").unwrap();
        assert!(verify_password("operator passphrase", &hash).is_ok());
        assert!(matches!(
            verify_password("operator passphrasf", &hash),
            Err(AdminAuthError::InvalidCredentials)
        ));
    }
}
