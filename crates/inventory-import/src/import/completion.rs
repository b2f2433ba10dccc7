//! Job completion detection

use anyhow::{Context, Result};
use std::sync::Arc;
use uuid::Uuid;

use super::store::JobStore;

/// Flips a job to `Completed` once every row is accounted for
///
/// Safe to call any number of times from any number of tasks; the
/// transition is a conditional update in the job store, so at most one
/// caller observes `true`.
#[derive(Clone)]
pub struct CompletionDetector {
    jobs: Arc<dyn JobStore>,
}

impl CompletionDetector {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }

    pub async fn check_and_complete(&self, job_id: Uuid) -> Result<bool> {
        let completed = self
            .jobs
            .complete_if_done(job_id)
            .await
            .with_context(|| format!("Failed to run completion check for job {}", job_id))?;

        if completed {
            if let Some(job) = self.jobs.get_job(job_id).await? {
                tracing::info!(
                    job_id = %job_id,
                    total_rows = ?job.total_rows,
                    processed_rows = job.processed_rows,
                    failed_rows = job.failed_rows,
                    "Import job completed"
                );
            }
        }

        Ok(completed)
    }
}
