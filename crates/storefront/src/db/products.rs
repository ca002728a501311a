//! Product repository.

use sqlx::PgPool;

use deskly_core::{Money, Product, ProductId};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Money,
    image_ref: Option<String>,
    active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            image_ref: row.image_ref,
            active: row.active,
        }
    }
}

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price, image_ref, active
            FROM storefront.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Get several products at once. Unknown IDs are simply absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<i64> = ids.iter().map(ProductId::as_i64).collect();
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price, image_ref, active
            FROM storefront.product
            WHERE id = ANY($1)
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Active products, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price, image_ref, active
            FROM storefront.product
            WHERE active
            ORDER BY name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        name: &str,
        price: Money,
        image_ref: Option<&str>,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO storefront.product (name, price, image_ref)
            VALUES ($1, $2, $3)
            RETURNING id, name, price, image_ref, active
            ",
        )
        .bind(name)
        .bind(price)
        .bind(image_ref)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}
