//! Consumer worker pool
//!
//! Each worker takes one chunk at a time off the bus, so the number of
//! chunks in flight never exceeds the pool size.

use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::bus::{ChunkBus, Delivery};
use super::consumer::ChunkConsumer;

/// Per-worker counters, summed by [`WorkerPool::join`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub chunks_consumed: u64,
    pub chunks_retried: u64,
    pub rows_processed: i64,
    pub rows_failed: i64,
    pub jobs_completed: u64,
}

impl WorkerStats {
    fn merge(&mut self, other: WorkerStats) {
        self.chunks_consumed += other.chunks_consumed;
        self.chunks_retried += other.chunks_retried;
        self.rows_processed += other.rows_processed;
        self.rows_failed += other.rows_failed;
        self.jobs_completed += other.jobs_completed;
    }
}

pub struct WorkerPool {
    workers: JoinSet<WorkerStats>,
    shutdown: CancellationToken,
}

impl WorkerPool {
    /// Start `size` workers draining `bus`
    ///
    /// Workers stop when `shutdown` is cancelled or the bus reports it is
    /// closed and empty.
    pub fn spawn(
        size: usize,
        bus: Arc<dyn ChunkBus>,
        consumer: ChunkConsumer,
        shutdown: CancellationToken,
    ) -> Self {
        let mut workers = JoinSet::new();
        for worker_id in 0..size.max(1) {
            let bus = bus.clone();
            let consumer = consumer.clone();
            let shutdown = shutdown.clone();
            workers.spawn(async move { run_worker(worker_id, bus, consumer, shutdown).await });
        }

        tracing::info!(workers = size.max(1), "Import worker pool started");

        Self { workers, shutdown }
    }

    /// Ask every worker to stop after its current chunk
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Wait for every worker to exit and return their combined stats
    pub async fn join(mut self) -> WorkerStats {
        let mut total = WorkerStats::default();
        while let Some(result) = self.workers.join_next().await {
            match result {
                Ok(stats) => total.merge(stats),
                Err(e) => tracing::error!(error = %e, "Import worker panicked"),
            }
        }
        tracing::info!(
            chunks = total.chunks_consumed,
            rows_processed = total.rows_processed,
            rows_failed = total.rows_failed,
            "Import worker pool stopped"
        );
        total
    }
}

async fn run_worker(
    worker_id: usize,
    bus: Arc<dyn ChunkBus>,
    consumer: ChunkConsumer,
    shutdown: CancellationToken,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    loop {
        let received = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = bus.receive() => received,
        };

        let delivery = match received {
            Ok(Some(delivery)) => delivery,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(worker_id, error = %format!("{:#}", e), "Failed to receive chunk");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => continue,
                }
            },
        };

        if let Err(e) = handle_delivery(&bus, &consumer, &delivery, &mut stats).await {
            tracing::error!(worker_id, error = %format!("{:#}", e), "Failed to settle chunk delivery");
        }
    }

    tracing::debug!(worker_id, chunks = stats.chunks_consumed, "Import worker exiting");
    stats
}

async fn handle_delivery(
    bus: &Arc<dyn ChunkBus>,
    consumer: &ChunkConsumer,
    delivery: &Delivery,
    stats: &mut WorkerStats,
) -> Result<()> {
    match consumer.consume(&delivery.chunk).await {
        Ok(outcome) => {
            stats.chunks_consumed += 1;
            stats.rows_processed += outcome.processed;
            stats.rows_failed += outcome.failed;
            if outcome.completed {
                stats.jobs_completed += 1;
            }
            bus.ack(delivery).await
        },
        Err(e) => {
            stats.chunks_retried += 1;
            let reason = format!("{:#}", e);
            tracing::warn!(
                job_id = %delivery.chunk.job_id,
                chunk_number = delivery.chunk.chunk_number,
                attempts = delivery.attempts,
                error = %reason,
                "Chunk consumption failed, returning it to the queue"
            );
            bus.nack(delivery, &reason).await
        },
    }
}
