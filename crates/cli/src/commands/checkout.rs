//! Drive a complete checkout against a running storefront.
//!
//! Logs in, fills the cart, walks ADDRESS and PAYMENT, submits, and prints
//! the created order. Payment data is validated locally before anything is
//! sent.

use clap::{Args, ValueEnum};
use deskly_client::{ClientConfig, CustomerSession, HttpStorefront};
use deskly_core::{AddressId, PaymentSelection, ProductId, ShippingOption};
use secrecy::SecretString;
use tracing::info;

use super::print_order;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shipping {
    Standard,
    Express,
}

impl From<Shipping> for ShippingOption {
    fn from(shipping: Shipping) -> Self {
        match shipping {
            Shipping::Standard => Self::Standard,
            Shipping::Express => Self::Express,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Method {
    Boleto,
    Card,
}

#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Customer email
    #[arg(short, long, env = "DESKLY_CUSTOMER_EMAIL")]
    email: String,

    /// Customer password
    #[arg(long, env = "DESKLY_CUSTOMER_PASSWORD", hide_env_values = true)]
    password: String,

    /// Cart line as `PRODUCT_ID:QUANTITY` (repeatable)
    #[arg(short, long = "item", value_parser = parse_item, required = true)]
    items: Vec<(ProductId, u32)>,

    /// Delivery address id (default: the customer's delivery default)
    #[arg(long)]
    address: Option<i64>,

    #[arg(long, value_enum, default_value_t = Shipping::Standard)]
    shipping: Shipping,

    #[arg(long, value_enum, default_value_t = Method::Boleto)]
    payment: Method,

    #[arg(long)]
    card_holder: Option<String>,

    #[arg(long)]
    card_number: Option<String>,

    /// Card expiry as `MM/YY`
    #[arg(long)]
    card_expiry: Option<String>,

    #[arg(long, env = "DESKLY_CARD_CVV", hide_env_values = true)]
    card_cvv: Option<String>,
}

impl CheckoutArgs {
    /// Missing card fields are passed on empty so local validation reports
    /// the first one.
    fn payment_selection(&self) -> PaymentSelection {
        match self.payment {
            Method::Boleto => PaymentSelection::boleto(),
            Method::Card => {
                let expiry = self.card_expiry.as_deref().unwrap_or_default();
                let (month, year) = expiry.split_once('/').unwrap_or((expiry, ""));
                PaymentSelection::card(
                    self.card_holder.clone().unwrap_or_default(),
                    self.card_number.clone().unwrap_or_default(),
                    month.trim(),
                    year.trim(),
                    self.card_cvv.clone().unwrap_or_default(),
                )
            }
        }
    }
}

fn parse_item(raw: &str) -> Result<(ProductId, u32), String> {
    let (id, quantity) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected PRODUCT_ID:QUANTITY, got {raw}"))?;
    let id = id
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid product id {id}: {e}"))?;
    let quantity = quantity
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid quantity {quantity}: {e}"))?;
    Ok((ProductId::new(id), quantity))
}

/// Run one checkout end to end.
///
/// # Errors
///
/// Returns the first login, cart, checkout or submission failure.
pub async fn run(args: CheckoutArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let mut session = CustomerSession::new(HttpStorefront::new(&config)?);

    session
        .login(&args.email, &SecretString::from(args.password.clone()))
        .await?;

    for (product_id, quantity) in &args.items {
        session.add_to_cart(*product_id, *quantity).await?;
    }
    info!(
        lines = session.cart().len(),
        subtotal = %session.cart().subtotal(),
        "Cart ready"
    );

    let selection = args.payment_selection();
    let order = {
        let mut checkout = session.checkout(config.submit_timeout);
        checkout.begin().await?;
        if let Some(id) = args.address {
            checkout.select_address(AddressId::new(id)).await?;
        }
        checkout.confirm_address().await?;
        checkout.choose_shipping(args.shipping.into()).await?;
        checkout.submit(selection).await?
    };

    print_order(&order);

    session.logout().await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item() {
        assert_eq!(parse_item("12:3").unwrap(), (ProductId::new(12), 3));
        assert_eq!(parse_item(" 7 : 1 ").unwrap(), (ProductId::new(7), 1));
        assert!(parse_item("12").is_err());
        assert!(parse_item("x:1").is_err());
        assert!(parse_item("1:-2").is_err());
    }

    #[test]
    fn test_card_selection_splits_expiry() {
        let args = CheckoutArgs {
            email: "ana@example.com".to_owned(),
            password: "secret".to_owned(),
            items: vec![(ProductId::new(1), 1)],
            address: None,
            shipping: Shipping::Standard,
            payment: Method::Card,
            card_holder: Some("Ana Souza".to_owned()),
            card_number: Some("4111111111111111".to_owned()),
            card_expiry: Some("12/30".to_owned()),
            card_cvv: Some("123".to_owned()),
        };
        let expected = PaymentSelection::card("Ana Souza", "4111111111111111", "12", "30", "123");
        assert_eq!(args.payment_selection(), expected);
    }

    #[test]
    fn test_card_without_fields_fails_validation() {
        let args = CheckoutArgs {
            email: "ana@example.com".to_owned(),
            password: "secret".to_owned(),
            items: vec![(ProductId::new(1), 1)],
            address: None,
            shipping: Shipping::Express,
            payment: Method::Card,
            card_holder: None,
            card_number: None,
            card_expiry: None,
            card_cvv: None,
        };
        assert!(args.payment_selection().validate().is_err());
    }
}
