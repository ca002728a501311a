//! Session-related types for operator authentication.

use serde::{Deserialize, Serialize};

use deskly_core::{BackofficeRole, BackofficeUser, BackofficeUserId, Email};

/// Session-stored operator identity.
///
/// The role is captured at login; a role change takes effect on the next
/// login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Operator's database ID.
    pub id: BackofficeUserId,
    pub email: Email,
    pub name: String,
    /// Operator's permission level.
    pub role: BackofficeRole,
}

impl From<BackofficeUser> for CurrentAdmin {
    fn from(user: BackofficeUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        }
    }
}

impl From<CurrentAdmin> for BackofficeUser {
    fn from(admin: CurrentAdmin) -> Self {
        Self {
            id: admin.id,
            email: admin.email,
            name: admin.name,
            role: admin.role,
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in operator.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
