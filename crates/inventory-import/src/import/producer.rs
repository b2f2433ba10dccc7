//! Import producer
//!
//! Streams a CSV source row by row, groups parsed rows into chunks and
//! publishes them to the [`ChunkBus`]. The file is read on a blocking thread
//! and handed over through a bounded channel, so memory use is bounded by
//! the channel capacity plus one chunk regardless of file size.
//!
//! The producer owns `total_rows`: it is written exactly once, after the
//! last chunk has been published.

use anyhow::{Context, Result};
use inventory_common::text::bounded_error_message;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::bus::ChunkBus;
use super::completion::CompletionDetector;
use super::parser::{raw_row, RowParser};
use super::store::ImportStores;
use super::types::{ImportChunk, ImportJob, JobStatus, NewImportError, ProductRecord};
use crate::config::{ImportConfig, ParseFailurePolicy};

/// Failure reason recorded for a source with a header but no data rows
pub const EMPTY_SOURCE_REASON: &str = "source contains no data rows";

/// One event from the file reader thread
#[derive(Debug)]
enum RowEvent {
    Parsed(ProductRecord),
    Rejected {
        row_number: i64,
        message: String,
        raw: Option<String>,
    },
    /// The source cannot be read any further
    Fatal(anyhow::Error),
}

/// How a producer run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerOutcome {
    /// Every row was read and every chunk published
    Finished,
    /// The job was cancelled while streaming
    Cancelled,
    /// The job was marked failed with this reason
    Failed(String),
}

/// Summary returned by the producer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerSummary {
    pub job_id: Uuid,
    pub rows_read: i64,
    pub rejected_rows: i64,
    pub chunks_published: i32,
    pub outcome: ProducerOutcome,
}

/// Handle to a started import
#[derive(Debug)]
pub struct ImportHandle {
    pub job_id: Uuid,
    pub task: JoinHandle<ProducerSummary>,
}

impl ImportHandle {
    /// Wait for the producer to finish streaming (not for the job to complete)
    pub async fn wait(self) -> Result<ProducerSummary> {
        self.task.await.context("Import producer task panicked")
    }
}

/// Why streaming stopped early
enum Stop {
    Cancelled,
    Failed(String),
}

#[derive(Clone)]
pub struct ImportProducer {
    stores: ImportStores,
    bus: Arc<dyn ChunkBus>,
    detector: CompletionDetector,
    config: ImportConfig,
}

impl ImportProducer {
    pub fn new(stores: ImportStores, bus: Arc<dyn ChunkBus>, config: ImportConfig) -> Self {
        let detector = CompletionDetector::new(stores.jobs.clone());
        Self {
            stores,
            bus,
            detector,
            config,
        }
    }

    /// Create a `Processing` job and start streaming `path` in the background
    ///
    /// Returns as soon as the job exists. Problems with the source itself
    /// (missing file, bad header) surface as a `Failed` job, not as an error.
    pub async fn start_import(&self, path: impl Into<PathBuf>) -> Result<ImportHandle> {
        let path = path.into();
        let job = ImportJob::started();
        self.stores
            .jobs
            .create_job(&job)
            .await
            .context("Failed to create import job")?;

        tracing::info!(job_id = %job.id, path = %path.display(), "Import job started");

        let producer = self.clone();
        let job_id = job.id;
        let task = tokio::spawn(async move { producer.run(job_id, path).await });

        Ok(ImportHandle { job_id, task })
    }

    #[tracing::instrument(skip(self, path), fields(job_id = %job_id))]
    async fn run(self, job_id: Uuid, path: PathBuf) -> ProducerSummary {
        let mut run = ProducerRun::new(&self, job_id);

        let outcome = match run.stream(&path).await {
            Ok(()) => match run.finish().await {
                Ok(outcome) => outcome,
                Err(e) => run.fail(format!("{:#}", e)).await,
            },
            Err(Stop::Cancelled) => run.stop_cancelled().await,
            Err(Stop::Failed(reason)) => run.fail(reason).await,
        };

        ProducerSummary {
            job_id,
            rows_read: run.rows_read,
            rejected_rows: run.rejected_rows,
            chunks_published: run.chunk_number,
            outcome,
        }
    }

    /// Publish with bounded retries; the bus may be briefly unavailable
    async fn publish_with_retry(&self, chunk: &ImportChunk) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.bus.publish(chunk).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.config.publish_retries => {
                    attempt += 1;
                    tracing::warn!(
                        job_id = %chunk.job_id,
                        chunk_number = chunk.chunk_number,
                        attempt,
                        error = %e,
                        "Chunk publish failed, retrying"
                    );
                    tokio::time::sleep(self.config.publish_retry_delay()).await;
                },
                Err(e) => {
                    return Err(e.context(format!(
                        "Failed to publish chunk {} after {} attempts",
                        chunk.chunk_number,
                        attempt + 1
                    )))
                },
            }
        }
    }
}

/// Mutable state of one producer run
struct ProducerRun<'a> {
    producer: &'a ImportProducer,
    job_id: Uuid,
    window: Vec<ProductRecord>,
    pending_errors: Vec<NewImportError>,
    rows_read: i64,
    rejected_rows: i64,
    chunk_number: i32,
}

impl<'a> ProducerRun<'a> {
    fn new(producer: &'a ImportProducer, job_id: Uuid) -> Self {
        Self {
            producer,
            job_id,
            window: Vec::with_capacity(producer.config.chunk_size),
            pending_errors: Vec::new(),
            rows_read: 0,
            rejected_rows: 0,
            chunk_number: 0,
        }
    }

    async fn stream(&mut self, path: &Path) -> Result<(), Stop> {
        let (tx, mut rx) = mpsc::channel(self.producer.config.channel_capacity.max(1));
        let source = path.to_path_buf();
        let reader = tokio::task::spawn_blocking(move || read_rows(&source, tx));

        while let Some(event) = rx.recv().await {
            match event {
                RowEvent::Parsed(record) => {
                    self.rows_read += 1;
                    self.window.push(record);
                    if self.window.len() >= self.producer.config.chunk_size {
                        self.publish_window().await?;
                    }
                },
                RowEvent::Rejected {
                    row_number,
                    message,
                    raw,
                } => {
                    self.rows_read += 1;
                    self.reject(row_number, &message, raw.as_deref());
                    if self.pending_errors.len() >= self.producer.config.chunk_size {
                        self.flush_rejections().await?;
                    }
                },
                RowEvent::Fatal(e) => {
                    return Err(Stop::Failed(format!("{:#}", e)));
                },
            }
        }

        if let Err(e) = reader.await {
            return Err(Stop::Failed(format!("Import reader thread panicked: {}", e)));
        }

        Ok(())
    }

    fn reject(&mut self, row_number: i64, message: &str, raw: Option<&str>) {
        self.rejected_rows += 1;
        match self.producer.config.parse_failures {
            ParseFailurePolicy::Count => {
                self.pending_errors.push(NewImportError::new(
                    self.job_id,
                    Some(row_number),
                    message,
                    raw,
                ));
            },
            ParseFailurePolicy::LogOnly => {
                tracing::warn!(job_id = %self.job_id, row_number, error = message, "Skipping unparseable row");
            },
        }
    }

    /// Publish the current window as the next chunk, then flush rejections
    async fn publish_window(&mut self) -> Result<(), Stop> {
        if !self.window.is_empty() {
            self.ensure_processing().await?;

            let chunk = ImportChunk {
                job_id: self.job_id,
                chunk_number: self.chunk_number,
                products: std::mem::take(&mut self.window),
            };
            self.producer
                .publish_with_retry(&chunk)
                .await
                .map_err(|e| Stop::Failed(format!("{:#}", e)))?;

            tracing::debug!(
                job_id = %self.job_id,
                chunk_number = chunk.chunk_number,
                rows = chunk.products.len(),
                "Chunk published"
            );
            self.chunk_number += 1;
            self.window = Vec::with_capacity(self.producer.config.chunk_size);
        }

        self.flush_rejections().await
    }

    async fn ensure_processing(&self) -> Result<(), Stop> {
        let job = self
            .producer
            .stores
            .jobs
            .get_job(self.job_id)
            .await
            .map_err(|e| Stop::Failed(format!("{:#}", e)))?;

        match job.map(|j| j.status) {
            Some(JobStatus::Processing) => Ok(()),
            Some(JobStatus::Cancelled) => Err(Stop::Cancelled),
            Some(other) => Err(Stop::Failed(format!("job left processing state ({})", other))),
            None => Err(Stop::Failed("import job disappeared".to_string())),
        }
    }

    /// Record parse rejections as failed rows
    ///
    /// Saving the error rows is best-effort; the counter update is not.
    async fn flush_rejections(&mut self) -> Result<(), Stop> {
        if self.pending_errors.is_empty() {
            return Ok(());
        }
        let errors = std::mem::take(&mut self.pending_errors);
        let stores = &self.producer.stores;

        if let Err(e) = stores.errors.save_errors(&errors).await {
            tracing::error!(
                job_id = %self.job_id,
                count = errors.len(),
                error = %e,
                "Failed to save parse errors"
            );
        }

        stores
            .jobs
            .increment_progress(self.job_id, 0, errors.len() as i64)
            .await
            .map(|_| ())
            .map_err(|e| Stop::Failed(format!("{:#}", e)))
    }

    /// End of stream: publish the tail, then fix the total
    async fn finish(&mut self) -> Result<ProducerOutcome> {
        match self.publish_window().await {
            Ok(()) => {},
            Err(Stop::Cancelled) => return Ok(self.stop_cancelled().await),
            Err(Stop::Failed(reason)) => return Ok(self.fail(reason).await),
        }

        if self.rows_read == 0 {
            return Ok(self.fail(EMPTY_SOURCE_REASON.to_string()).await);
        }

        let jobs = &self.producer.stores.jobs;
        jobs.finalize_total_rows(self.job_id, self.rows_read)
            .await
            .context("Failed to record total rows")?;

        tracing::info!(
            job_id = %self.job_id,
            total_rows = self.rows_read,
            rejected_rows = self.rejected_rows,
            chunks = self.chunk_number,
            "Import source fully published"
        );

        // Consumers may have accounted for every row before the total was known
        self.producer.detector.check_and_complete(self.job_id).await?;

        Ok(ProducerOutcome::Finished)
    }

    async fn stop_cancelled(&mut self) -> ProducerOutcome {
        self.window.clear();
        tracing::info!(job_id = %self.job_id, rows_read = self.rows_read, "Import cancelled, producer stopping");

        if let Err(e) = self
            .producer
            .stores
            .jobs
            .finalize_total_rows(self.job_id, self.rows_read)
            .await
        {
            tracing::warn!(job_id = %self.job_id, error = %e, "Failed to record total rows of cancelled import");
        }
        ProducerOutcome::Cancelled
    }

    async fn fail(&mut self, reason: String) -> ProducerOutcome {
        let reason = bounded_error_message(&reason);
        self.window.clear();
        self.pending_errors.clear();
        tracing::error!(job_id = %self.job_id, reason = %reason, "Import job failed");

        match self.producer.stores.jobs.fail_job(self.job_id, &reason).await {
            Ok(true) => {},
            Ok(false) => {
                tracing::warn!(job_id = %self.job_id, "Import job was already terminal when failing")
            },
            Err(e) => {
                tracing::error!(job_id = %self.job_id, error = %e, "Failed to mark import job failed")
            },
        }
        ProducerOutcome::Failed(reason)
    }
}

/// Read `path` on a blocking thread, sending one event per data row
///
/// Row numbers are 1-based and count data rows only. Stops early if the
/// receiving side goes away.
fn read_rows(path: &Path, events: mpsc::Sender<RowEvent>) {
    let fatal = |e: anyhow::Error| {
        let _ = events.blocking_send(RowEvent::Fatal(e));
    };

    let mut reader = match RowParser::reader_builder().from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            return fatal(
                anyhow::Error::new(e)
                    .context(format!("Failed to open import source {}", path.display())),
            )
        },
    };

    let parser = match reader.headers() {
        Ok(headers) => match RowParser::from_headers(headers) {
            Ok(parser) => parser,
            Err(e) => return fatal(e.into()),
        },
        Err(e) => return fatal(anyhow::Error::new(e).context("Failed to read header row")),
    };

    for (index, result) in reader.records().enumerate() {
        let row_number = index as i64 + 1;
        let event = match result {
            Ok(record) => match parser.parse(row_number, &record) {
                Ok(product) => RowEvent::Parsed(product),
                Err(e) => RowEvent::Rejected {
                    row_number,
                    message: e.to_string(),
                    raw: Some(raw_row(&record)),
                },
            },
            Err(e) if e.is_io_error() => {
                return fatal(
                    anyhow::Error::new(e)
                        .context(format!("Failed reading import source at row {}", row_number)),
                )
            },
            // Undecodable bytes mean the source is not UTF-8 text
            Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                return fatal(
                    anyhow::Error::new(e)
                        .context(format!("Failed decoding import source at row {}", row_number)),
                )
            },
            Err(e) => RowEvent::Rejected {
                row_number,
                message: format!("row {}: {}", row_number, e),
                raw: None,
            },
        };

        if events.blocking_send(event).is_err() {
            return;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::import::bus::MemoryChunkBus;
    use crate::import::memory::MemoryStores;
    use crate::import::store::{ErrorStore, JobStore};
    use std::io::Write;

    const HEADER: &str =
        "Index,Internal ID,Name,Description,Brand,Category,Price,Currency,Stock,EAN,Color,Size,Availability";

    fn row(i: usize) -> String {
        format!(
            "{i},SKU-{i},Product {i},Desc {i},Acme,Kitchen,9.99,USD,5,400638133393{d},Blue,M,in_stock",
            i = i,
            d = i % 10
        )
    }

    fn csv_file(rows: &[String]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for r in rows {
            writeln!(file, "{}", r).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn producer(
        stores: &MemoryStores,
        bus: Arc<MemoryChunkBus>,
        config: ImportConfig,
    ) -> ImportProducer {
        ImportProducer::new(stores.stores(), bus, config)
    }

    async fn drain(bus: &MemoryChunkBus) -> Vec<ImportChunk> {
        bus.close();
        let mut chunks = Vec::new();
        while let Some(delivery) = bus.receive().await.unwrap() {
            bus.ack(&delivery).await.unwrap();
            chunks.push(delivery.chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn test_chunks_are_sized_and_numbered() {
        let rows: Vec<_> = (1..=2500).map(row).collect();
        let file = csv_file(&rows);
        let stores = MemoryStores::new();
        let bus = Arc::new(MemoryChunkBus::new(8));
        let config = ImportConfig {
            chunk_size: 1000,
            ..ImportConfig::default()
        };

        let handle = producer(&stores, bus.clone(), config)
            .start_import(file.path())
            .await
            .unwrap();
        let summary = handle.wait().await.unwrap();

        assert_eq!(summary.outcome, ProducerOutcome::Finished);
        assert_eq!(summary.rows_read, 2500);
        assert_eq!(summary.chunks_published, 3);

        let chunks = drain(&bus).await;
        let sizes: Vec<_> = chunks.iter().map(|c| c.products.len()).collect();
        let numbers: Vec<_> = chunks.iter().map(|c| c.chunk_number).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
        assert_eq!(numbers, vec![0, 1, 2]);
        assert_eq!(chunks[2].products[499].row_number, Some(2500));

        let job = stores.jobs.get_job(summary.job_id).await.unwrap().unwrap();
        assert_eq!(job.total_rows, Some(2500));
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_parse_failures_are_counted_by_default() {
        let mut rows: Vec<_> = (1..=3).map(row).collect();
        rows[1] = rows[1].replace("9.99", "abc");
        let file = csv_file(&rows);
        let stores = MemoryStores::new();
        let bus = Arc::new(MemoryChunkBus::new(8));

        let summary = producer(&stores, bus.clone(), ImportConfig::default())
            .start_import(file.path())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.rejected_rows, 1);

        let chunks = drain(&bus).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].products.len(), 2);

        let job = stores.jobs.get_job(summary.job_id).await.unwrap().unwrap();
        assert_eq!(job.total_rows, Some(3));
        assert_eq!(job.failed_rows, 1);
        assert_eq!(job.processed_rows, 0);

        let errors = stores.errors.list_errors(summary.job_id, 10, 0).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row_number, Some(2));
        assert!(errors[0].error_message.contains("Price"));
        assert!(errors[0].row_data.as_ref().unwrap().contains("SKU-2"));
    }

    #[tokio::test]
    async fn test_log_only_policy_skips_error_rows() {
        let mut rows: Vec<_> = (1..=3).map(row).collect();
        rows[1] = rows[1].replace("9.99", "abc");
        let file = csv_file(&rows);
        let stores = MemoryStores::new();
        let bus = Arc::new(MemoryChunkBus::new(8));
        let config = ImportConfig {
            parse_failures: ParseFailurePolicy::LogOnly,
            ..ImportConfig::default()
        };

        let summary = producer(&stores, bus, config)
            .start_import(file.path())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        let job = stores.jobs.get_job(summary.job_id).await.unwrap().unwrap();
        assert_eq!(job.total_rows, Some(3));
        assert_eq!(job.failed_rows, 0);
        assert_eq!(stores.errors.count_errors(summary.job_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_source_fails_job() {
        let stores = MemoryStores::new();
        let bus = Arc::new(MemoryChunkBus::new(8));

        let handle = producer(&stores, bus.clone(), ImportConfig::default())
            .start_import("/definitely/not/here/products.csv")
            .await
            .unwrap();

        let job = stores.jobs.get_job(handle.job_id).await.unwrap().unwrap();
        assert!(matches!(job.status, JobStatus::Processing | JobStatus::Failed));

        let summary = handle.wait().await.unwrap();
        assert!(matches!(summary.outcome, ProducerOutcome::Failed(_)));

        let job = stores.jobs.get_job(summary.job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.failure_reason.unwrap().contains("products.csv"));
        assert!(job.end_time.is_some());
        assert!(drain(&bus).await.is_empty());
    }

    #[tokio::test]
    async fn test_header_only_source_fails_job() {
        let file = csv_file(&[]);
        let stores = MemoryStores::new();
        let bus = Arc::new(MemoryChunkBus::new(8));

        let summary = producer(&stores, bus, ImportConfig::default())
            .start_import(file.path())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(
            summary.outcome,
            ProducerOutcome::Failed(EMPTY_SOURCE_REASON.to_string())
        );
        let job = stores.jobs.get_job(summary.job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.total_rows, None);
    }

    #[tokio::test]
    async fn test_missing_header_column_fails_job() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Name,Price").unwrap();
        writeln!(file, "Bottle,1.00").unwrap();
        let stores = MemoryStores::new();
        let bus = Arc::new(MemoryChunkBus::new(8));

        let summary = producer(&stores, bus, ImportConfig::default())
            .start_import(file.path())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        match summary.outcome {
            ProducerOutcome::Failed(reason) => assert!(reason.contains("Internal ID")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_undecodable_row_fails_job() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "{}", row(1)).unwrap();
        file.write_all(b"2,SKU-2,Bottle \xff\xfe,Desc,Acme,Kitchen,9.99,USD,5,4006381333932,Blue,M,in_stock\n")
            .unwrap();
        writeln!(file, "{}", row(3)).unwrap();
        file.flush().unwrap();
        let stores = MemoryStores::new();
        let bus = Arc::new(MemoryChunkBus::new(8));

        let summary = producer(&stores, bus.clone(), ImportConfig::default())
            .start_import(file.path())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        match summary.outcome {
            ProducerOutcome::Failed(reason) => assert!(reason.contains("row 2"), "{}", reason),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(summary.chunks_published, 0);
        assert!(drain(&bus).await.is_empty());

        let job = stores.jobs.get_job(summary.job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.total_rows, None);
        assert_eq!(stores.errors.count_errors(summary.job_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_long_failure_reason_is_bounded() {
        let stores = MemoryStores::new();
        let bus = Arc::new(MemoryChunkBus::new(8));
        let missing = format!("/{}/products.csv", "nested".repeat(300));

        let summary = producer(&stores, bus, ImportConfig::default())
            .start_import(missing)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        match &summary.outcome {
            ProducerOutcome::Failed(reason) => {
                assert!(reason.chars().count() <= inventory_common::text::MAX_ERROR_MESSAGE_CHARS)
            },
            other => panic!("unexpected outcome {:?}", other),
        }

        let job = stores.jobs.get_job(summary.job_id).await.unwrap().unwrap();
        let reason = job.failure_reason.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(reason.chars().count() <= inventory_common::text::MAX_ERROR_MESSAGE_CHARS);
    }

    #[tokio::test]
    async fn test_cancelled_job_publishes_nothing() {
        let rows: Vec<_> = (1..=10).map(row).collect();
        let file = csv_file(&rows);
        let stores = MemoryStores::new();
        let bus = Arc::new(MemoryChunkBus::new(8));

        let handle = producer(&stores, bus.clone(), ImportConfig::default())
            .start_import(file.path())
            .await
            .unwrap();
        assert!(stores.jobs.cancel_job(handle.job_id).await.unwrap());

        let summary = handle.wait().await.unwrap();
        assert_eq!(summary.outcome, ProducerOutcome::Cancelled);
        assert_eq!(summary.chunks_published, 0);
        assert!(drain(&bus).await.is_empty());

        let job = stores.jobs.get_job(summary.job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_publish_failure_fails_job_after_retries() {
        let rows: Vec<_> = (1..=3).map(row).collect();
        let file = csv_file(&rows);
        let stores = MemoryStores::new();
        let bus = Arc::new(MemoryChunkBus::new(8));
        bus.close();
        let config = ImportConfig {
            publish_retries: 2,
            publish_retry_delay_ms: 1,
            ..ImportConfig::default()
        };

        let summary = producer(&stores, bus, config)
            .start_import(file.path())
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        match summary.outcome {
            ProducerOutcome::Failed(reason) => assert!(reason.contains("after 3 attempts")),
            other => panic!("unexpected outcome {:?}", other),
        }
        let job = stores.jobs.get_job(summary.job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }
}
