//! Shared helpers for inventory-import integration tests
//!
//! - CSV fixtures written to temporary directories
//! - A PostgreSQL container with migrations applied (needs Docker)

#![allow(dead_code)]

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

/// Header row of a product import file
pub const HEADER: &str =
    "Index,Name,Description,Brand,Category,Price,Currency,Stock,EAN,Color,Size,Availability,Internal ID";

pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,inventory_import=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}

/// A valid data row for product number `n`
pub fn product_line(n: usize) -> String {
    format!(
        "{n},Product {n},Insulated bottle #{n},Acme,Kitchen,{price},USD,{stock},400638133{ean:04},Blue,M,in_stock,SKU-{n:06}",
        n = n,
        price = format!("{}.99", n % 90 + 10),
        stock = n % 500,
        ean = n % 10_000,
    )
}

/// Write `HEADER` followed by `lines` to `dir/name`
pub fn write_csv(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut content = String::from(HEADER);
    content.push('\n');
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    std::fs::write(&path, content).unwrap_or_else(|e| panic!("failed to write {}: {}", path.display(), e));
    path
}

/// `count` valid rows numbered from 1
pub fn valid_lines(count: usize) -> Vec<String> {
    (1..=count).map(product_line).collect()
}

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

/// PostgreSQL container with the import schema migrated
pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        inventory_import::db::run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            _container: container,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn pool_clone(&self) -> PgPool {
        self.pool.clone()
    }
}
