//! `products` table

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::import::store::ProductStore;
use crate::import::types::NewProduct;

const INSERT_PRODUCTS: &str = "INSERT INTO products (internal_id, name, description, brand, \
                               category, price, currency, stock, ean, color, size, availability) ";

#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
    batch_size: usize,
}

impl PgProductStore {
    /// `batch_size` bounds the rows per INSERT statement, not per transaction
    pub fn new(pool: PgPool, batch_size: usize) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
        }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn insert_batch(&self, products: &[NewProduct]) -> Result<()> {
        if products.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;

        for batch in products.chunks(self.batch_size) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(INSERT_PRODUCTS);
            builder.push_values(batch, |mut b, p| {
                b.push_bind(&p.internal_id)
                    .push_bind(&p.name)
                    .push_bind(&p.description)
                    .push_bind(&p.brand)
                    .push_bind(&p.category)
                    .push_bind(&p.price)
                    .push_bind(&p.currency)
                    .push_bind(p.stock)
                    .push_bind(&p.ean)
                    .push_bind(&p.color)
                    .push_bind(&p.size)
                    .push_bind(&p.availability);
            });
            builder
                .build()
                .execute(&mut *tx)
                .await
                .context("Failed to bulk insert products")?;
        }

        tx.commit().await.context("Failed to commit product batch")?;
        Ok(())
    }

    async fn insert_one(&self, product: &NewProduct) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                internal_id, name, description, brand, category, price,
                currency, stock, ean, color, size, availability
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&product.internal_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.brand)
        .bind(&product.category)
        .bind(&product.price)
        .bind(&product.currency)
        .bind(product.stock)
        .bind(&product.ean)
        .bind(&product.color)
        .bind(&product.size)
        .bind(&product.availability)
        .execute(&self.pool)
        .await
        .map_err(describe_insert_error)?;

        Ok(())
    }
}

/// Turn constraint violations into a message fit for an import error row
fn describe_insert_error(err: sqlx::Error) -> anyhow::Error {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return anyhow::anyhow!("duplicate product: {}", db_err.message());
        }
        if db_err.is_check_violation() {
            return anyhow::anyhow!("product violates constraint: {}", db_err.message());
        }
    }
    anyhow::Error::new(err).context("Failed to insert product")
}
