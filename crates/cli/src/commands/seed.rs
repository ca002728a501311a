//! Seed the database with a demo catalog and, optionally, a demo customer.
//!
//! Safe to run more than once: the catalog is only inserted into an empty
//! product table and an existing customer email is left alone.

use deskly_core::Money;
use deskly_storefront::db::ProductRepository;
use deskly_storefront::services::{AuthError, AuthService};
use secrecy::SecretString;
use tracing::{info, warn};

use super::database_url;

/// Demo catalog: name, price in cents, image reference.
const CATALOG: &[(&str, i64, &str)] = &[
    ("Mesa de escritório 120x60", 89_990, "products/mesa-120x60.jpg"),
    ("Cadeira ergonômica", 124_900, "products/cadeira-ergonomica.jpg"),
    ("Suporte articulado para monitor", 21_900, "products/suporte-monitor.jpg"),
    ("Luminária de mesa LED", 15_990, "products/luminaria-led.jpg"),
    ("Apoio para pés", 8_990, "products/apoio-pes.jpg"),
    ("Organizador de cabos", 3_490, "products/organizador-cabos.jpg"),
];

/// A customer account to create alongside the catalog.
pub struct SeedCustomer {
    pub email: String,
    pub name: String,
    pub password: SecretString,
}

/// Insert the demo catalog and customer.
///
/// # Errors
///
/// Returns an error if the database is unreachable, a write fails, or the
/// customer's email or password is rejected.
pub async fn run(customer: Option<SeedCustomer>) -> Result<(), Box<dyn std::error::Error>> {
    let url = database_url("STOREFRONT_DATABASE_URL")
        .ok_or("STOREFRONT_DATABASE_URL (or DATABASE_URL) not set")?;
    let pool = deskly_storefront::db::create_pool(&url).await?;

    let products = ProductRepository::new(&pool);
    if products.list_active().await?.is_empty() {
        for (name, cents, image_ref) in CATALOG {
            let product = products
                .create(name, Money::from_cents(*cents), Some(image_ref))
                .await?;
            info!(product_id = %product.id, name = %product.name, price = %product.price, "Product created");
        }
        info!(count = CATALOG.len(), "Catalog seeded");
    } else {
        info!("Catalog already has active products, skipping");
    }

    if let Some(customer) = customer {
        match AuthService::new(&pool)
            .register(&customer.email, &customer.name, &customer.password)
            .await
        {
            Ok(profile) => info!(customer_id = %profile.id, email = %profile.email, "Customer created"),
            Err(AuthError::UserAlreadyExists) => {
                warn!(email = %customer.email, "Customer already exists, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
