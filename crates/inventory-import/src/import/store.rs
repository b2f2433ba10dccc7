//! Persistence seams for the import pipeline
//!
//! Postgres implementations live in `crate::db`; in-memory ones in
//! [`super::memory`].

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::types::{ImportError, ImportJob, JobCounters, NewImportError, NewProduct};

/// Job lifecycle and progress counters
///
/// Every mutating method must be atomic with respect to concurrent callers.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: &ImportJob) -> Result<()>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<ImportJob>>;

    /// Set `total_rows` once; returns false if it was already set
    async fn finalize_total_rows(&self, job_id: Uuid, total_rows: i64) -> Result<bool>;

    /// Atomically add to both counters and return the values after the add
    async fn increment_progress(
        &self,
        job_id: Uuid,
        processed: i64,
        failed: i64,
    ) -> Result<JobCounters>;

    /// Flip `Processing` to `Completed` if every row is accounted for
    ///
    /// Returns true only for the caller that performed the transition.
    async fn complete_if_done(&self, job_id: Uuid) -> Result<bool>;

    /// Flip `Processing` to `Failed`; returns false if the job was not processing
    async fn fail_job(&self, job_id: Uuid, reason: &str) -> Result<bool>;

    /// Flip `Processing` to `Cancelled`; returns false if the job was not processing
    async fn cancel_job(&self, job_id: Uuid) -> Result<bool>;
}

/// Append-only import error log
#[async_trait]
pub trait ErrorStore: Send + Sync {
    async fn save_errors(&self, errors: &[NewImportError]) -> Result<()>;

    async fn list_errors(&self, job_id: Uuid, limit: i64, offset: i64)
        -> Result<Vec<ImportError>>;

    async fn count_errors(&self, job_id: Uuid) -> Result<i64>;
}

/// Product persistence
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert all products or none of them
    async fn insert_batch(&self, products: &[NewProduct]) -> Result<()>;

    async fn insert_one(&self, product: &NewProduct) -> Result<()>;
}

/// The three stores the pipeline writes to
#[derive(Clone)]
pub struct ImportStores {
    pub jobs: Arc<dyn JobStore>,
    pub errors: Arc<dyn ErrorStore>,
    pub products: Arc<dyn ProductStore>,
}
