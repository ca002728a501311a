//! Catalog products as exposed to the storefront.

use serde::{Deserialize, Serialize};

use super::cart::ProductSnapshot;
use super::id::ProductId;
use super::money::Money;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    /// Inactive products can be viewed but not ordered.
    pub active: bool,
}

impl Product {
    /// The data a cart line keeps about this product.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            name: self.name.clone(),
            unit_price: self.price,
            image_ref: self.image_ref.clone(),
        }
    }
}
