//! Subcommand implementations.

pub mod admin;
pub mod checkout;
pub mod migrate;
pub mod orders;
pub mod seed;

use deskly_core::{Order, PaymentMethod};
use secrecy::SecretString;

/// Connection string for a component: its own variable, then `DATABASE_URL`.
///
/// Both servers share one database, so a single `DATABASE_URL` is enough
/// for local setups.
pub(crate) fn database_url(var: &str) -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var(var)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

#[allow(clippy::print_stdout)]
pub(crate) fn print_order(order: &Order) {
    println!(
        "Order #{}  {} ({})",
        order.id,
        order.status,
        order.status.label()
    );
    println!("  placed     {}", order.created_at.format("%Y-%m-%d %H:%M UTC"));
    println!("  deliver to {}", order.address.one_line());
    for item in &order.items {
        println!(
            "  {:>3} x {:<36} {:>14}",
            item.quantity,
            item.product_name,
            item.subtotal.to_brl()
        );
    }
    println!("  shipping   {:>44}", order.shipping_value.to_brl());
    println!("  total      {:>44}", order.total_value.to_brl());
    match (order.payment_method, order.card_last_four_digits.as_deref()) {
        (PaymentMethod::Card, Some(last_four)) => println!("  paid by    card ending {last_four}"),
        (method, _) => println!("  paid by    {method}"),
    }
}
