//! Session-local shopping cart.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::money::Money;
use super::order::NewOrderItem;

/// Catalog data captured when a product is put in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub name: String,
    pub unit_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

/// One product and quantity in the cart. `quantity` is never zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub product: ProductSnapshot,
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.product.unit_price.times(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("product {0} is not in the cart")]
    UnknownProduct(ProductId),
}

/// The basket of the active session.
///
/// Lines are kept in insertion order and are unique per product: adding a
/// product that is already present increases its quantity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add `quantity` units of a product, merging with an existing line.
    ///
    /// The snapshot of an existing line is refreshed so the cart shows the
    /// latest price the customer saw. Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] when `quantity` is zero.
    pub fn add(
        &mut self,
        product_id: ProductId,
        product: ProductSnapshot,
        quantity: u32,
    ) -> Result<u32, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = line.quantity.saturating_add(quantity);
            line.product = product;
            return Ok(line.quantity);
        }
        self.lines.push(CartLine {
            product_id,
            product,
            quantity,
        });
        Ok(quantity)
    }

    /// Replace the quantity of a line. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnknownProduct`] if the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        let index = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or(CartError::UnknownProduct(product_id))?;
        if quantity == 0 {
            self.lines.remove(index);
        } else if let Some(line) = self.lines.get_mut(index) {
            line.quantity = quantity;
        }
        Ok(())
    }

    /// Remove a line, returning it if it was present.
    pub fn remove(&mut self, product_id: ProductId) -> Option<CartLine> {
        let index = self.lines.iter().position(|l| l.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Subtotal as displayed to the customer. The server recomputes it.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// The order items to submit for this cart.
    #[must_use]
    pub fn order_items(&self) -> Vec<NewOrderItem> {
        self.lines
            .iter()
            .map(|l| NewOrderItem {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect()
    }
}
