//! `import_jobs` table

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventory_common::text::bounded_error_message;
use sqlx::PgPool;
use uuid::Uuid;

use crate::import::store::JobStore;
use crate::import::types::{ImportJob, JobCounters, JobStatus};

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    status: String,
    total_rows: Option<i64>,
    processed_rows: i64,
    failed_rows: i64,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

impl TryFrom<JobRow> for ImportJob {
    type Error = anyhow::Error;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(ImportJob {
            id: row.id,
            status: row.status.parse()?,
            total_rows: row.total_rows,
            processed_rows: row.processed_rows,
            failed_rows: row.failed_rows,
            start_time: row.start_time,
            end_time: row.end_time,
            failure_reason: row.failure_reason,
        })
    }
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn finish(&self, job_id: Uuid, status: JobStatus, reason: Option<&str>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE import_jobs
            SET status = $1, end_time = NOW(), failure_reason = $2
            WHERE id = $3 AND status = $4
            "#,
        )
        .bind(status.as_str())
        .bind(reason.map(bounded_error_message))
        .bind(job_id)
        .bind(JobStatus::Processing.as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to mark import job {}", status))?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(&self, job: &ImportJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO import_jobs (
                id, status, total_rows, processed_rows, failed_rows, start_time
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(job.total_rows)
        .bind(job.processed_rows)
        .bind(job.failed_rows)
        .bind(job.start_time)
        .execute(&self.pool)
        .await
        .context("Failed to create import job")?;

        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<ImportJob>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, status, total_rows, processed_rows, failed_rows,
                   start_time, end_time, failure_reason
            FROM import_jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch import job")?;

        row.map(ImportJob::try_from).transpose()
    }

    async fn finalize_total_rows(&self, job_id: Uuid, total_rows: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE import_jobs
            SET total_rows = $1
            WHERE id = $2 AND total_rows IS NULL
            "#,
        )
        .bind(total_rows)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .context("Failed to record total rows")?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment_progress(
        &self,
        job_id: Uuid,
        processed: i64,
        failed: i64,
    ) -> Result<JobCounters> {
        let counters: Option<(Option<i64>, i64, i64)> = sqlx::query_as(
            r#"
            UPDATE import_jobs
            SET processed_rows = processed_rows + $1,
                failed_rows = failed_rows + $2
            WHERE id = $3
            RETURNING total_rows, processed_rows, failed_rows
            "#,
        )
        .bind(processed)
        .bind(failed)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update import progress")?;

        let (total_rows, processed_rows, failed_rows) =
            counters.with_context(|| format!("Import job {} not found", job_id))?;

        Ok(JobCounters {
            total_rows,
            processed_rows,
            failed_rows,
        })
    }

    async fn complete_if_done(&self, job_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE import_jobs
            SET status = $1, end_time = NOW()
            WHERE id = $2
              AND status = $3
              AND total_rows IS NOT NULL
              AND total_rows > 0
              AND processed_rows + failed_rows >= total_rows
            "#,
        )
        .bind(JobStatus::Completed.as_str())
        .bind(job_id)
        .bind(JobStatus::Processing.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to complete import job")?;

        Ok(result.rows_affected() == 1)
    }

    async fn fail_job(&self, job_id: Uuid, reason: &str) -> Result<bool> {
        self.finish(job_id, JobStatus::Failed, Some(reason)).await
    }

    async fn cancel_job(&self, job_id: Uuid) -> Result<bool> {
        self.finish(job_id, JobStatus::Cancelled, None).await
    }
}
