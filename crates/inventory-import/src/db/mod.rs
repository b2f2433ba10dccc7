//! PostgreSQL persistence
//!
//! All queries are runtime-checked (`sqlx::query` / `query_as` with `.bind`)
//! so the crate builds without a live database.

pub mod errors;
pub mod jobs;
pub mod products;
pub mod queue;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::AppResult;
use crate::import::ImportStores;

pub use errors::PgErrorStore;
pub use jobs::PgJobStore;
pub use products::PgProductStore;
pub use queue::PgChunkQueue;

pub async fn create_pool(config: &DatabaseConfig) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Apply pending migrations from `migrations/`
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> AppResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Job, error and product stores backed by `pool`
pub fn postgres_stores(pool: PgPool, store_batch_size: usize) -> ImportStores {
    ImportStores {
        jobs: Arc::new(PgJobStore::new(pool.clone())),
        errors: Arc::new(PgErrorStore::new(pool.clone())),
        products: Arc::new(PgProductStore::new(pool, store_batch_size)),
    }
}
