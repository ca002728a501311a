//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use deskly_core::{CustomerId, CustomerProfile, Email};

/// Session-stored customer identity.
///
/// Minimal data stored in the session to identify the logged-in customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Customer's database ID.
    pub id: CustomerId,
    /// Customer's email address.
    pub email: Email,
    pub name: String,
}

impl From<CustomerProfile> for CurrentCustomer {
    fn from(profile: CustomerProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            name: profile.name,
        }
    }
}

impl From<CurrentCustomer> for CustomerProfile {
    fn from(current: CurrentCustomer) -> Self {
        Self {
            id: current.id,
            email: current.email,
            name: current.name,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";
}
