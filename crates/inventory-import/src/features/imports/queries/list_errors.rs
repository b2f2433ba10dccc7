//! List job errors query
//!
//! Paginated view of the error log of one import job, oldest first.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::import::{ImportError, ImportStores};

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListJobErrorsQuery {
    pub job_id: Uuid,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListJobErrorsResponse {
    pub job_id: Uuid,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub errors: Vec<ImportError>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListJobErrorsError {
    #[error("Limit must be between 1 and {max}", max = MAX_PAGE_SIZE)]
    InvalidLimit,
    #[error("Offset cannot be negative")]
    InvalidOffset,
    #[error("Import job not found")]
    NotFound,
    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl Request<Result<ListJobErrorsResponse, ListJobErrorsError>> for ListJobErrorsQuery {}

impl ListJobErrorsQuery {
    pub fn validate(&self) -> Result<(), ListJobErrorsError> {
        if let Some(limit) = self.limit {
            if !(1..=MAX_PAGE_SIZE).contains(&limit) {
                return Err(ListJobErrorsError::InvalidLimit);
            }
        }
        if let Some(offset) = self.offset {
            if offset < 0 {
                return Err(ListJobErrorsError::InvalidOffset);
            }
        }
        Ok(())
    }
}

pub async fn handle(
    stores: &ImportStores,
    query: ListJobErrorsQuery,
) -> Result<ListJobErrorsResponse, ListJobErrorsError> {
    query.validate()?;

    if stores.jobs.get_job(query.job_id).await?.is_none() {
        return Err(ListJobErrorsError::NotFound);
    }

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let total = stores.errors.count_errors(query.job_id).await?;
    let errors = stores.errors.list_errors(query.job_id, limit, offset).await?;

    Ok(ListJobErrorsResponse {
        job_id: query.job_id,
        total,
        limit,
        offset,
        errors,
    })
}
