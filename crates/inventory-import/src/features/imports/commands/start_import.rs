//! Start import command
//!
//! Creates a `Processing` job and hands the source to the producer. The
//! source is not opened here; an unreadable file shows up as a `Failed` job.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ImportConfig;
use crate::import::{ImportHandle, ImportProducer, JobStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartImportCommand {
    /// File name relative to the data directory, or an absolute path
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartImportResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub source: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StartImportError {
    #[error("File name is required and cannot be empty")]
    FileRequired,
    #[error("Failed to start import: {0:#}")]
    Pipeline(#[from] anyhow::Error),
}

impl Request<Result<StartImportResponse, StartImportError>> for StartImportCommand {}

impl StartImportCommand {
    pub fn validate(&self) -> Result<(), StartImportError> {
        if self.file.trim().is_empty() {
            return Err(StartImportError::FileRequired);
        }
        Ok(())
    }
}

/// Start the import; the returned handle tracks the producer task
#[tracing::instrument(skip(producer, config))]
pub async fn handle(
    producer: &ImportProducer,
    config: &ImportConfig,
    command: StartImportCommand,
) -> Result<(StartImportResponse, ImportHandle), StartImportError> {
    command.validate()?;

    let source = config.resolve_source(command.file.trim());

    let handle = producer.start_import(source.clone()).await?;

    Ok((
        StartImportResponse {
            job_id: handle.job_id,
            status: JobStatus::Processing,
            source: source.display().to_string(),
        },
        handle,
    ))
}
