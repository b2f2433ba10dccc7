use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::import::{ImportStores, JobStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelImportCommand {
    pub job_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelImportResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum CancelImportError {
    #[error("Import job '{0}' not found")]
    NotFound(Uuid),
    #[error("Import job '{0}' is already {1}")]
    AlreadyFinished(Uuid, JobStatus),
    #[error("Failed to cancel import: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl Request<Result<CancelImportResponse, CancelImportError>> for CancelImportCommand {}

/// Cancel a processing job
///
/// Chunks already on the bus are still drained, but their rows are recorded
/// as failed instead of being persisted.
#[tracing::instrument(skip(stores))]
pub async fn handle(
    stores: &ImportStores,
    command: CancelImportCommand,
) -> Result<CancelImportResponse, CancelImportError> {
    if stores.jobs.cancel_job(command.job_id).await? {
        tracing::info!(job_id = %command.job_id, "Import job cancelled");
        return Ok(CancelImportResponse {
            job_id: command.job_id,
            status: JobStatus::Cancelled,
        });
    }

    match stores.jobs.get_job(command.job_id).await? {
        Some(job) => Err(CancelImportError::AlreadyFinished(command.job_id, job.status)),
        None => Err(CancelImportError::NotFound(command.job_id)),
    }
}
