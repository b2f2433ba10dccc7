//! Import queries

pub mod get_job;
pub mod list_errors;

pub use get_job::{GetJobError, GetJobQuery, JobDetails};
pub use list_errors::{ListJobErrorsError, ListJobErrorsQuery, ListJobErrorsResponse};
