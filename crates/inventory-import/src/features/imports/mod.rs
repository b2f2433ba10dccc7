//! Imports feature module
//!
//! Starting an import returns as soon as the job exists; progress is read
//! back through the job queries.

pub mod commands;
pub mod queries;

pub use commands::{
    CancelImportCommand, CancelImportError, CancelImportResponse, StartImportCommand,
    StartImportError, StartImportResponse,
};
pub use queries::{
    GetJobError, GetJobQuery, JobDetails, ListJobErrorsError, ListJobErrorsQuery,
    ListJobErrorsResponse,
};
