//! Authenticated principals and the login payload.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{BackofficeUserId, CustomerId};
use super::status::BackofficeRole;

/// The logged-in storefront customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub id: CustomerId,
    pub email: Email,
    pub name: String,
}

/// The logged-in backoffice operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackofficeUser {
    pub id: BackofficeUserId,
    pub email: Email,
    pub name: String,
    pub role: BackofficeRole,
}

/// Body of `POST /api/auth/login` on both servers.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
