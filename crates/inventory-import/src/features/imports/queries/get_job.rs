//! Get job query
//!
//! Query to get a single import job by ID.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::import::{ImportJob, ImportStores};

/// Query to get a job by ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobQuery {
    pub job_id: Uuid,
}

/// Job details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetails {
    #[serde(flatten)]
    pub job: ImportJob,
    pub completion_percentage: f64,
    pub error_count: i64,
}

/// Error type for get job query
#[derive(Debug, thiserror::Error)]
pub enum GetJobError {
    #[error("Import job not found")]
    NotFound,
    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl Request<Result<JobDetails, GetJobError>> for GetJobQuery {}

pub async fn handle(stores: &ImportStores, query: GetJobQuery) -> Result<JobDetails, GetJobError> {
    let job = stores
        .jobs
        .get_job(query.job_id)
        .await?
        .ok_or(GetJobError::NotFound)?;
    let error_count = stores.errors.count_errors(query.job_id).await?;

    Ok(JobDetails {
        completion_percentage: job.completion_percentage(),
        job,
        error_count,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::import::{ErrorStore, JobStatus, JobStore, MemoryStores, NewImportError};

    #[tokio::test]
    async fn test_handle_reports_progress() {
        let memory = MemoryStores::new();
        let job = ImportJob::started();
        memory.jobs.create_job(&job).await.unwrap();
        memory.jobs.finalize_total_rows(job.id, 4).await.unwrap();
        memory.jobs.increment_progress(job.id, 1, 1).await.unwrap();
        memory
            .errors
            .save_errors(&[NewImportError::new(job.id, Some(2), "bad price", None)])
            .await
            .unwrap();

        let details = handle(&memory.stores(), GetJobQuery { job_id: job.id })
            .await
            .unwrap();

        assert_eq!(details.job.status, JobStatus::Processing);
        assert_eq!(details.completion_percentage, 50.0);
        assert_eq!(details.error_count, 1);

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["status"], "processing");
        assert_eq!(json["total_rows"], 4);
    }

    #[tokio::test]
    async fn test_handle_not_found() {
        let memory = MemoryStores::new();
        let result = handle(
            &memory.stores(),
            GetJobQuery {
                job_id: Uuid::new_v4(),
            },
        )
        .await;
        assert!(matches!(result, Err(GetJobError::NotFound)));
    }
}
