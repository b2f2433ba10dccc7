//! Chunk consumer
//!
//! Persists one chunk: bulk insert first, row-by-row fallback when the bulk
//! insert fails, then error logging, progress accounting and the completion
//! check, in that order.

use anyhow::{Context, Result};
use uuid::Uuid;

use super::completion::CompletionDetector;
use super::store::ImportStores;
use super::types::{ImportChunk, JobStatus, NewImportError, NewProduct};

/// Error message recorded for rows of a chunk that arrived after cancellation
pub const CANCELLED_ROW_MESSAGE: &str = "import cancelled before chunk was persisted";

/// Result of consuming one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub job_id: Uuid,
    pub chunk_number: i32,
    pub processed: i64,
    pub failed: i64,
    /// Whether the bulk insert failed and rows were retried one by one
    pub used_fallback: bool,
    /// Whether this chunk flipped the job to `Completed`
    pub completed: bool,
    /// The job was unknown; nothing was written
    pub dropped: bool,
}

impl ChunkOutcome {
    fn dropped(chunk: &ImportChunk) -> Self {
        Self {
            job_id: chunk.job_id,
            chunk_number: chunk.chunk_number,
            processed: 0,
            failed: 0,
            used_fallback: false,
            completed: false,
            dropped: true,
        }
    }
}

#[derive(Clone)]
pub struct ChunkConsumer {
    stores: ImportStores,
    detector: CompletionDetector,
}

impl ChunkConsumer {
    pub fn new(stores: ImportStores) -> Self {
        let detector = CompletionDetector::new(stores.jobs.clone());
        Self { stores, detector }
    }

    /// Persist one chunk and account for every row in it
    ///
    /// An `Err` means the job counters were not updated and the chunk may be
    /// redelivered. Products and error rows from the failed attempt may
    /// already be stored, so a redelivery reports those rows again as
    /// duplicates; the counters still account each row exactly once.
    #[tracing::instrument(skip(self, chunk), fields(job_id = %chunk.job_id, chunk_number = chunk.chunk_number))]
    pub async fn consume(&self, chunk: &ImportChunk) -> Result<ChunkOutcome> {
        let job = self
            .stores
            .jobs
            .get_job(chunk.job_id)
            .await
            .context("Failed to load import job")?;

        let Some(job) = job else {
            tracing::warn!(job_id = %chunk.job_id, "Dropping chunk for unknown import job");
            return Ok(ChunkOutcome::dropped(chunk));
        };

        let mut errors = Vec::new();
        let mut processed = 0i64;
        let mut used_fallback = false;

        if job.status != JobStatus::Processing {
            let message = match job.status {
                JobStatus::Cancelled => CANCELLED_ROW_MESSAGE.to_string(),
                other => format!("import job is {}; chunk was not persisted", other),
            };
            tracing::info!(status = %job.status, rows = chunk.products.len(), "Skipping chunk of inactive import job");
            errors.extend(
                chunk
                    .products
                    .iter()
                    .map(|record| NewImportError::for_record(chunk.job_id, record, &message)),
            );
        } else {
            let mut valid = Vec::with_capacity(chunk.products.len());
            for record in &chunk.products {
                match NewProduct::try_from(record) {
                    Ok(product) => valid.push((record, product)),
                    Err(e) => {
                        errors.push(NewImportError::for_record(chunk.job_id, record, &e.to_string()))
                    },
                }
            }

            if !valid.is_empty() {
                let products: Vec<NewProduct> = valid.iter().map(|(_, p)| p.clone()).collect();
                match self.stores.products.insert_batch(&products).await {
                    Ok(()) => processed = products.len() as i64,
                    Err(e) => {
                        used_fallback = true;
                        tracing::warn!(
                            rows = products.len(),
                            error = %e,
                            "Bulk insert failed, falling back to row-by-row inserts"
                        );
                        for (record, product) in &valid {
                            match self.stores.products.insert_one(product).await {
                                Ok(()) => processed += 1,
                                Err(e) => errors.push(NewImportError::for_record(
                                    chunk.job_id,
                                    record,
                                    &format!("{:#}", e),
                                )),
                            }
                        }
                    },
                }
            }
        }

        let failed = errors.len() as i64;
        if !errors.is_empty() {
            if let Err(e) = self.stores.errors.save_errors(&errors).await {
                tracing::error!(count = failed, error = %e, "Failed to save import errors");
            }
        }

        let counters = self
            .stores
            .jobs
            .increment_progress(chunk.job_id, processed, failed)
            .await
            .context("Failed to update import progress")?;

        tracing::debug!(
            processed,
            failed,
            processed_rows = counters.processed_rows,
            failed_rows = counters.failed_rows,
            total_rows = ?counters.total_rows,
            "Chunk consumed"
        );

        // Counters are already applied; a redelivery now would double count
        let completed = match self.detector.check_and_complete(chunk.job_id).await {
            Ok(completed) => completed,
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "Completion check failed after chunk was accounted");
                false
            },
        };

        Ok(ChunkOutcome {
            job_id: chunk.job_id,
            chunk_number: chunk.chunk_number,
            processed,
            failed,
            used_fallback,
            completed,
            dropped: false,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::import::memory::MemoryStores;
    use crate::import::store::{ErrorStore, JobStore, ProductStore};
    use crate::import::types::fixtures::{chunk, product};
    use crate::import::types::ImportJob;

    async fn started_job(stores: &MemoryStores, total: Option<i64>) -> Uuid {
        let job = ImportJob::started();
        stores.jobs.create_job(&job).await.unwrap();
        if let Some(total) = total {
            stores.jobs.finalize_total_rows(job.id, total).await.unwrap();
        }
        job.id
    }

    #[tokio::test]
    async fn test_clean_chunk_is_bulk_inserted_and_completes_job() {
        let stores = MemoryStores::new();
        let job_id = started_job(&stores, Some(3)).await;
        let consumer = ChunkConsumer::new(stores.stores());

        let outcome = consumer.consume(&chunk(job_id, 0, 1, 3)).await.unwrap();

        assert_eq!(outcome.processed, 3);
        assert_eq!(outcome.failed, 0);
        assert!(!outcome.used_fallback);
        assert!(outcome.completed);
        assert_eq!(stores.products.len(), 3);
        assert_eq!(stores.products.batch_calls(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_row_falls_back_to_row_by_row() {
        let stores = MemoryStores::new();
        let job_id = started_job(&stores, Some(1000)).await;
        let existing = NewProduct::try_from(&product("SKU-500", 1)).unwrap();
        stores.products.insert_one(&existing).await.unwrap();
        let consumer = ChunkConsumer::new(stores.stores());

        let outcome = consumer.consume(&chunk(job_id, 0, 1, 1000)).await.unwrap();

        assert!(outcome.used_fallback);
        assert_eq!(outcome.processed, 999);
        assert_eq!(outcome.failed, 1);
        assert!(outcome.completed);

        let errors = stores.errors.list_errors(job_id, 10, 0).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row_number, Some(500));
        assert!(errors[0].error_message.contains("SKU-500"));
        assert!(errors[0].row_data.as_ref().unwrap().contains("\"internalId\":\"SKU-500\""));

        let job = stores.jobs.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.processed_rows, 999);
        assert_eq!(job.failed_rows, 1);
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_store_outage_fails_every_row() {
        let stores = MemoryStores::new();
        let job_id = started_job(&stores, Some(4)).await;
        stores.products.set_available(false);
        let consumer = ChunkConsumer::new(stores.stores());

        let outcome = consumer.consume(&chunk(job_id, 0, 1, 4)).await.unwrap();

        assert_eq!(outcome.processed, 0);
        assert_eq!(outcome.failed, 4);
        assert_eq!(stores.errors.count_errors(job_id).await.unwrap(), 4);
        // Every row accounted for, so the job still reaches a terminal state
        assert!(outcome.completed);
    }

    #[tokio::test]
    async fn test_redelivery_after_progress_failure_counts_rows_once() {
        let stores = MemoryStores::new();
        let job_id = started_job(&stores, Some(3)).await;
        let existing = NewProduct::try_from(&product("SKU-2", 1)).unwrap();
        stores.products.insert_one(&existing).await.unwrap();
        let consumer = ChunkConsumer::new(stores.stores());
        let delivered = chunk(job_id, 0, 1, 3);

        stores.jobs.set_progress_available(false);
        assert!(consumer.consume(&delivered).await.is_err());

        // Products and the error row from the first attempt are kept
        let job = stores.jobs.get_job(job_id).await.unwrap().unwrap();
        assert_eq!((job.processed_rows, job.failed_rows), (0, 0));
        assert_eq!(stores.products.len(), 3);
        assert_eq!(stores.errors.count_errors(job_id).await.unwrap(), 1);

        stores.jobs.set_progress_available(true);
        let outcome = consumer.consume(&delivered).await.unwrap();

        // Rows stored by the first attempt now fail as duplicates
        assert_eq!(outcome.processed, 0);
        assert_eq!(outcome.failed, 3);
        assert!(outcome.completed);
        assert_eq!(stores.products.len(), 3);
        assert_eq!(stores.errors.count_errors(job_id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_mapping_failures_are_recorded() {
        let stores = MemoryStores::new();
        let job_id = started_job(&stores, None).await;
        let mut bad = chunk(job_id, 0, 1, 3);
        bad.products[1].name = String::new();
        let consumer = ChunkConsumer::new(stores.stores());

        let outcome = consumer.consume(&bad).await.unwrap();

        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.failed, 1);
        assert!(!outcome.used_fallback);
        assert!(!outcome.completed);
        let errors = stores.errors.list_errors(job_id, 10, 0).await.unwrap();
        assert_eq!(errors[0].error_message, "product name is blank");
    }

    #[tokio::test]
    async fn test_error_save_failure_does_not_block_accounting() {
        let stores = MemoryStores::new();
        let job_id = started_job(&stores, Some(2)).await;
        stores.errors.set_available(false);
        let mut bad = chunk(job_id, 0, 1, 2);
        bad.products[0].name = " ".to_string();
        let consumer = ChunkConsumer::new(stores.stores());

        let outcome = consumer.consume(&bad).await.unwrap();

        assert_eq!(outcome.failed, 1);
        assert!(outcome.completed);
        let job = stores.jobs.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.failed_rows, 1);
        assert_eq!(job.processed_rows, 1);
    }

    #[tokio::test]
    async fn test_cancelled_job_rows_are_not_persisted() {
        let stores = MemoryStores::new();
        let job_id = started_job(&stores, Some(5)).await;
        stores.jobs.cancel_job(job_id).await.unwrap();
        let consumer = ChunkConsumer::new(stores.stores());

        let outcome = consumer.consume(&chunk(job_id, 0, 1, 5)).await.unwrap();

        assert_eq!(outcome.processed, 0);
        assert_eq!(outcome.failed, 5);
        assert!(!outcome.completed);
        assert!(stores.products.is_empty());
        let job = stores.jobs.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.failed_rows, 5);
    }

    #[tokio::test]
    async fn test_failed_job_rows_are_not_persisted() {
        let stores = MemoryStores::new();
        let job_id = started_job(&stores, None).await;
        stores.jobs.fail_job(job_id, "publish failed").await.unwrap();
        let consumer = ChunkConsumer::new(stores.stores());

        let outcome = consumer.consume(&chunk(job_id, 0, 1, 2)).await.unwrap();

        assert_eq!(outcome.failed, 2);
        assert!(stores.products.is_empty());
        let errors = stores.errors.list_errors(job_id, 10, 0).await.unwrap();
        assert_eq!(errors[0].error_message, "import job is failed; chunk was not persisted");
    }

    #[tokio::test]
    async fn test_unknown_job_is_dropped() {
        let stores = MemoryStores::new();
        let consumer = ChunkConsumer::new(stores.stores());

        let outcome = consumer.consume(&chunk(Uuid::new_v4(), 0, 1, 2)).await.unwrap();

        assert!(outcome.dropped);
        assert!(stores.products.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_chunks_account_every_row() {
        let stores = MemoryStores::new();
        let job_id = started_job(&stores, Some(5000)).await;
        let consumer = ChunkConsumer::new(stores.stores());

        let handles: Vec<_> = (0..5)
            .map(|n| {
                let consumer = consumer.clone();
                tokio::spawn(async move {
                    consumer
                        .consume(&chunk(job_id, n, n as i64 * 1000 + 1, 1000))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut completions = 0;
        for handle in handles {
            if handle.await.unwrap().completed {
                completions += 1;
            }
        }

        assert_eq!(completions, 1);
        let job = stores.jobs.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.processed_rows, 5000);
        assert_eq!(job.status, JobStatus::Completed);
    }
}
