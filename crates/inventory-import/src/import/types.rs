//! Core types for the bulk-import pipeline

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use inventory_common::text::{bounded_error_message, bounded_row_data};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Import job status
///
/// `Pending` is never written by the pipeline; jobs are created `Processing`.
/// `Completed`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(anyhow::anyhow!("Unknown job status: {}", other)),
        }
    }
}

/// Import job (maps to import_jobs table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: Uuid,
    pub status: JobStatus,
    /// Unknown until the producer reaches end-of-stream
    pub total_rows: Option<i64>,
    pub processed_rows: i64,
    pub failed_rows: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl ImportJob {
    /// A freshly started job: `Processing`, counters at zero, total unknown
    pub fn started() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Processing,
            total_rows: None,
            processed_rows: 0,
            failed_rows: 0,
            start_time: Utc::now(),
            end_time: None,
            failure_reason: None,
        }
    }

    /// Rows that have reached a final outcome (persisted or failed)
    pub fn rows_accounted(&self) -> i64 {
        self.processed_rows + self.failed_rows
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the completion check may flip this job to `Completed`.
    ///
    /// A total of zero or an unset total means "not yet known".
    pub fn is_ready_to_complete(&self) -> bool {
        match self.total_rows {
            Some(total) if total > 0 => {
                self.status == JobStatus::Processing && self.rows_accounted() >= total
            },
            _ => false,
        }
    }

    /// Calculate completion percentage against the known total
    pub fn completion_percentage(&self) -> f64 {
        match self.total_rows {
            Some(total) if total > 0 => {
                (self.rows_accounted() as f64 / total as f64 * 100.0).min(100.0)
            },
            _ => 0.0,
        }
    }
}

/// Counter snapshot returned by an atomic increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    pub total_rows: Option<i64>,
    pub processed_rows: i64,
    pub failed_rows: i64,
}

/// One unresolved row (maps to import_errors table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportError {
    pub id: i64,
    pub job_id: Uuid,
    pub row_number: Option<i64>,
    pub error_message: String,
    pub row_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An import error about to be appended
///
/// The constructor enforces the bounded-length contract on both text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImportError {
    pub job_id: Uuid,
    pub row_number: Option<i64>,
    pub error_message: String,
    pub row_data: Option<String>,
}

impl NewImportError {
    pub fn new(
        job_id: Uuid,
        row_number: Option<i64>,
        error_message: &str,
        row_data: Option<&str>,
    ) -> Self {
        Self {
            job_id,
            row_number,
            error_message: bounded_error_message(error_message),
            row_data: row_data.map(bounded_row_data),
        }
    }

    /// Error for a record that was on the wire; the payload is its JSON form
    pub fn for_record(job_id: Uuid, record: &ProductRecord, error_message: &str) -> Self {
        let payload = serde_json::to_string(record)
            .unwrap_or_else(|_| format!("internalId: {}", record.internal_id));
        Self::new(job_id, record.row_number, error_message, Some(&payload))
    }
}

/// Parsed product row as carried inside a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// 1-based data row number in the source file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_number: Option<i64>,
    pub internal_id: String,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub price: BigDecimal,
    pub currency: String,
    pub stock: i32,
    pub ean: String,
    pub color: String,
    pub size: String,
    pub availability: String,
}

/// Chunk message: a fixed-size group of parsed rows for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportChunk {
    pub job_id: Uuid,
    /// 0-based, assigned by the producer in publish order
    pub chunk_number: i32,
    pub products: Vec<ProductRecord>,
}

/// Maximum characters accepted for a product description
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Decimal places stored for a price (`NUMERIC(19, 4)`)
pub const MAX_PRICE_SCALE: i64 = 4;

/// Why a wire record could not be mapped to a storage record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("product name is blank")]
    BlankName,
    #[error("description has {0} characters, limit is {max}", max = MAX_DESCRIPTION_CHARS)]
    DescriptionTooLong(usize),
    #[error("price {0} has more than {max} decimal places", max = MAX_PRICE_SCALE)]
    PriceScale(String),
}

/// Product ready for insertion (maps to products table)
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub internal_id: String,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub price: BigDecimal,
    pub currency: String,
    pub stock: i32,
    pub ean: String,
    pub color: String,
    pub size: String,
    pub availability: String,
}

impl TryFrom<&ProductRecord> for NewProduct {
    type Error = MappingError;

    fn try_from(record: &ProductRecord) -> Result<Self, Self::Error> {
        if record.name.trim().is_empty() {
            return Err(MappingError::BlankName);
        }
        let description_len = record.description.chars().count();
        if description_len > MAX_DESCRIPTION_CHARS {
            return Err(MappingError::DescriptionTooLong(description_len));
        }
        // Trailing zeros do not count; anything finer would be rounded on insert
        let (_, scale) = record.price.normalized().as_bigint_and_exponent();
        if scale > MAX_PRICE_SCALE {
            return Err(MappingError::PriceScale(record.price.to_string()));
        }

        Ok(Self {
            internal_id: record.internal_id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            brand: record.brand.clone(),
            category: record.category.clone(),
            price: record.price.clone(),
            currency: record.currency.clone(),
            stock: record.stock,
            ean: record.ean.clone(),
            color: record.color.clone(),
            size: record.size.clone(),
            availability: record.availability.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use super::*;
    use std::str::FromStr;

    pub fn product(internal_id: &str, row_number: i64) -> ProductRecord {
        ProductRecord {
            row_number: Some(row_number),
            internal_id: internal_id.to_string(),
            name: format!("Product {}", internal_id),
            description: "Stainless steel water bottle".to_string(),
            brand: "Acme".to_string(),
            category: "Kitchen".to_string(),
            price: BigDecimal::from_str("19.99").unwrap(),
            currency: "USD".to_string(),
            stock: 42,
            ean: "4006381333931".to_string(),
            color: "Blue".to_string(),
            size: "M".to_string(),
            availability: "in_stock".to_string(),
        }
    }

    pub fn chunk(job_id: Uuid, chunk_number: i32, first_row: i64, len: usize) -> ImportChunk {
        ImportChunk {
            job_id,
            chunk_number,
            products: (0..len as i64)
                .map(|i| product(&format!("SKU-{}", first_row + i), first_row + i))
                .collect(),
        }
    }
}
