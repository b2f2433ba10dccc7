//! `import_errors` table

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::import::store::ErrorStore;
use crate::import::types::{ImportError, NewImportError};

/// Rows per INSERT; keeps bind parameters well under the Postgres limit
const ERROR_INSERT_BATCH: usize = 1000;

#[derive(Debug, sqlx::FromRow)]
struct ErrorRow {
    id: i64,
    job_id: Uuid,
    row_number: Option<i64>,
    error_message: String,
    row_data: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ErrorRow> for ImportError {
    fn from(row: ErrorRow) -> Self {
        ImportError {
            id: row.id,
            job_id: row.job_id,
            row_number: row.row_number,
            error_message: row.error_message,
            row_data: row.row_data,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgErrorStore {
    pool: PgPool,
}

impl PgErrorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ErrorStore for PgErrorStore {
    async fn save_errors(&self, errors: &[NewImportError]) -> Result<()> {
        if errors.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;

        for batch in errors.chunks(ERROR_INSERT_BATCH) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO import_errors (job_id, row_number, error_message, row_data) ",
            );
            builder.push_values(batch, |mut b, error| {
                b.push_bind(error.job_id)
                    .push_bind(error.row_number)
                    .push_bind(&error.error_message)
                    .push_bind(&error.row_data);
            });
            builder
                .build()
                .execute(&mut *tx)
                .await
                .context("Failed to insert import errors")?;
        }

        tx.commit().await.context("Failed to commit import errors")?;
        Ok(())
    }

    async fn list_errors(
        &self,
        job_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ImportError>> {
        let rows = sqlx::query_as::<_, ErrorRow>(
            r#"
            SELECT id, job_id, row_number, error_message, row_data, created_at
            FROM import_errors
            WHERE job_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(job_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list import errors")?;

        Ok(rows.into_iter().map(ImportError::from).collect())
    }

    async fn count_errors(&self, job_id: Uuid) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM import_errors WHERE job_id = $1")
                .bind(job_id)
                .fetch_one(&self.pool)
                .await
                .context("Failed to count import errors")?;
        Ok(count)
    }
}
