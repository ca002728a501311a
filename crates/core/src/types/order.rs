//! Orders, their item snapshots and the shared pricing function.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::AddressSnapshot;
use super::id::{AddressId, OrderId, ProductId};
use super::money::Money;
use super::payment::PaymentSelection;
use super::status::{OrderStatus, PaymentMethod};

/// A line of a placed order, frozen at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl OrderItem {
    #[must_use]
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            subtotal: unit_price.times(quantity),
        }
    }
}

/// A placed order.
///
/// Everything except `status` and `updated_at` is fixed once the order is
/// created. The address is a copy taken at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    pub address: AddressSnapshot,
    pub shipping_value: Money,
    pub total_value: Money,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_holder_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_last_four_digits: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Sum of item subtotals, without shipping.
    #[must_use]
    pub fn items_total(&self) -> Money {
        self.items.iter().map(|i| i.subtotal).sum()
    }

    /// Whether the stored totals agree with the items and shipping.
    #[must_use]
    pub fn totals_consistent(&self) -> bool {
        !self.items.is_empty()
            && self
                .items
                .iter()
                .all(|i| i.subtotal == i.unit_price.times(i.quantity))
            && self.total_value == self.items_total() + self.shipping_value
    }
}

/// Product and quantity as submitted by the customer. Names and prices
/// are looked up on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of an order submission.
///
/// Submitting the same `idempotency_key` twice with the same
/// [`fingerprint`](NewOrder::fingerprint) yields the order created by the
/// first request. Reusing a key for a different order is refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub idempotency_key: Uuid,
    pub address_id: AddressId,
    pub shipping_value: Money,
    pub items: Vec<NewOrderItem>,
    #[serde(flatten)]
    pub payment: PaymentSelection,
}

impl NewOrder {
    /// What this request orders, in canonical form: items merged and sorted
    /// by product, then address, shipping value and payment method.
    ///
    /// Card details are not part of it.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut quantities: Vec<(ProductId, u64)> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match quantities.iter_mut().find(|(id, _)| *id == item.product_id) {
                Some((_, quantity)) => *quantity += u64::from(item.quantity),
                None => quantities.push((item.product_id, u64::from(item.quantity))),
            }
        }
        quantities.sort_unstable_by_key(|(id, _)| *id);

        let items = quantities
            .iter()
            .map(|(id, quantity)| format!("{id}x{quantity}"))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "address={};shipping={};method={};items={items}",
            self.address_id, self.shipping_value, self.payment.method
        )
    }
}

/// Body of a status change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// One entry of an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub order_id: OrderId,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    /// Email of the operator, if the user still exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Shipping options published by the storefront.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShippingOption {
    #[default]
    Standard,
    Express,
}

impl ShippingOption {
    pub const ALL: [Self; 2] = [Self::Standard, Self::Express];

    #[must_use]
    pub fn value(self) -> Money {
        match self {
            Self::Standard => Money::from_cents(1_500),
            Self::Express => Money::from_cents(3_000),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "Entrega padrão",
            Self::Express => "Entrega expressa",
        }
    }

    #[must_use]
    pub fn quote(self) -> ShippingQuote {
        ShippingQuote {
            option: self,
            label: self.label().to_owned(),
            value: self.value(),
        }
    }
}

/// A shipping option with its price, as listed to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    #[serde(rename = "id")]
    pub option: ShippingOption,
    pub label: String,
    pub value: Money,
}

/// Catalog data for one submitted line, ready to be priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

/// Result of pricing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub items: Vec<OrderItem>,
    pub shipping_value: Money,
    pub total_value: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("order must have at least one item")]
    EmptyOrder,
    #[error("quantity for product {0} must be at least 1")]
    ZeroQuantity(ProductId),
    #[error("shipping value cannot be negative")]
    NegativeShipping,
    #[error("product {0} has a negative price")]
    NegativePrice(ProductId),
    #[error("shipping value cannot exceed {}", Money::MAX)]
    ShippingTooLarge,
    #[error("order total cannot exceed {}", Money::MAX)]
    Overflow,
}

/// Check a client-supplied shipping value before anything is priced.
///
/// # Errors
///
/// [`PricingError::NegativeShipping`] or [`PricingError::ShippingTooLarge`].
pub fn check_shipping(shipping_value: Money) -> Result<(), PricingError> {
    if shipping_value.is_negative() {
        Err(PricingError::NegativeShipping)
    } else if shipping_value > Money::MAX {
        Err(PricingError::ShippingTooLarge)
    } else {
        Ok(())
    }
}

/// Compute item subtotals and the order total.
///
/// `total_value` is the sum of subtotals plus shipping. This is the only
/// place totals are computed.
///
/// Every amount produced fits [`Money::MAX`]; nothing here can overflow.
///
/// # Errors
///
/// Returns a [`PricingError`] for an empty order, a zero quantity, a
/// negative price or shipping value, or amounts beyond [`Money::MAX`].
pub fn price_order(lines: Vec<PricedLine>, shipping_value: Money) -> Result<PricedOrder, PricingError> {
    if lines.is_empty() {
        return Err(PricingError::EmptyOrder);
    }
    check_shipping(shipping_value)?;

    let items = lines
        .into_iter()
        .map(|line| {
            if line.quantity == 0 {
                return Err(PricingError::ZeroQuantity(line.product_id));
            }
            if line.unit_price.is_negative() {
                return Err(PricingError::NegativePrice(line.product_id));
            }
            let subtotal = line
                .unit_price
                .checked_times(line.quantity)
                .filter(Money::is_storable)
                .ok_or(PricingError::Overflow)?;
            Ok(OrderItem {
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total_value = items
        .iter()
        .try_fold(shipping_value, |total, item| total.checked_add(item.subtotal))
        .filter(Money::is_storable)
        .ok_or(PricingError::Overflow)?;
    Ok(PricedOrder {
        items,
        shipping_value,
        total_value,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn line(id: i64, cents: i64, quantity: u32) -> PricedLine {
        PricedLine {
            product_id: ProductId::new(id),
            product_name: format!("Produto {id}"),
            unit_price: Money::from_cents(cents),
            quantity,
        }
    }

    #[test]
    fn test_two_desks_plus_standard_shipping() {
        let priced = price_order(vec![line(1, 5_000, 2)], ShippingOption::Standard.value()).unwrap();
        assert_eq!(priced.total_value, Money::from_cents(11_500));
        assert_eq!(priced.items[0].subtotal, Money::from_cents(10_000));
    }

    #[test]
    fn test_total_is_sum_of_subtotals_plus_shipping() {
        let priced = price_order(
            vec![line(1, 1_999, 3), line(2, 1, 1), line(3, 125_050, 2)],
            Money::from_cents(3_000),
        )
        .unwrap();
        let sum: Money = priced.items.iter().map(|i| i.subtotal).sum();
        assert_eq!(priced.total_value, sum + priced.shipping_value);
        assert_eq!(priced.total_value, Money::from_cents(5_997 + 1 + 250_100 + 3_000));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(price_order(vec![], Money::ZERO), Err(PricingError::EmptyOrder));
        assert_eq!(
            price_order(vec![line(4, 100, 0)], Money::ZERO),
            Err(PricingError::ZeroQuantity(ProductId::new(4)))
        );
        assert_eq!(
            price_order(vec![line(1, 100, 1)], Money::from_cents(-1)),
            Err(PricingError::NegativeShipping)
        );
        assert_eq!(
            price_order(vec![line(5, -100, 1)], Money::ZERO),
            Err(PricingError::NegativePrice(ProductId::new(5)))
        );
    }

    #[test]
    fn test_amounts_beyond_column_range_are_refused() {
        let huge: Money = serde_json::from_str("\"79228162514264337593543950335\"").unwrap();
        assert_eq!(
            price_order(vec![line(1, 100, 1)], huge),
            Err(PricingError::ShippingTooLarge)
        );
        assert_eq!(
            price_order(vec![line(1, 100, 1)], Money::MAX),
            Err(PricingError::Overflow)
        );
        assert_eq!(
            price_order(vec![line(2, 999_999_999_999, u32::MAX)], Money::ZERO),
            Err(PricingError::Overflow)
        );
        assert!(price_order(vec![line(3, 100, 1)], Money::from_cents(999_999_999_899)).is_ok());
    }

    #[test]
    fn test_new_order_wire_shape() {
        let order = NewOrder {
            idempotency_key: Uuid::nil(),
            address_id: AddressId::new(3),
            shipping_value: Money::from_cents(1_500),
            items: vec![NewOrderItem {
                product_id: ProductId::new(1),
                quantity: 2,
            }],
            payment: PaymentSelection::boleto(),
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["addressId"], 3);
        assert_eq!(json["shippingValue"], "15.00");
        assert_eq!(json["paymentMethod"], "BOLETO");
        assert_eq!(json["items"][0]["productId"], 1);

        let back: NewOrder = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_fingerprint_ignores_line_order_and_splits() {
        let order = |items: &[(i64, u32)], shipping: i64| NewOrder {
            idempotency_key: Uuid::nil(),
            address_id: AddressId::new(3),
            shipping_value: Money::from_cents(shipping),
            items: items
                .iter()
                .map(|&(id, quantity)| NewOrderItem {
                    product_id: ProductId::new(id),
                    quantity,
                })
                .collect(),
            payment: PaymentSelection::boleto(),
        };

        let base = order(&[(1, 2), (5, 1)], 1_500);
        assert_eq!(
            base.fingerprint(),
            "address=3;shipping=15.00;method=BOLETO;items=1x2,5x1"
        );
        assert_eq!(order(&[(5, 1), (1, 1), (1, 1)], 1_500).fingerprint(), base.fingerprint());
        assert_ne!(order(&[(1, 5), (5, 1)], 1_500).fingerprint(), base.fingerprint());
        assert_ne!(order(&[(1, 2), (5, 1)], 3_000).fingerprint(), base.fingerprint());

        let mut by_card = base.clone();
        by_card.payment = PaymentSelection::card("ANA", "4111111111111111", "01", "2030", "123");
        assert_ne!(by_card.fingerprint(), base.fingerprint());
    }

    #[test]
    fn test_shipping_quotes() {
        let quote = ShippingOption::Express.quote();
        assert_eq!(quote.value, Money::from_cents(3_000));
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["id"], "EXPRESS");
        assert_eq!(json["label"], "Entrega expressa");
        assert_eq!(ShippingOption::default(), ShippingOption::Standard);
    }
}
