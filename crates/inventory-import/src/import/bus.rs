//! Chunk message bus
//!
//! Delivery is at-least-once: a chunk that is received but never acked is
//! handed out again (by the durable queue after its visibility timeout, by
//! the in-memory bus immediately on nack, even after it has been closed).

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{mpsc, Notify};

use super::types::ImportChunk;

/// A received chunk plus the bookkeeping needed to ack or nack it
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Queue row id; `None` for in-process deliveries
    pub id: Option<i64>,
    /// How many times this message has been handed out, including this one
    pub attempts: i32,
    pub chunk: ImportChunk,
}

#[async_trait]
pub trait ChunkBus: Send + Sync {
    /// Publish a chunk; returns once the bus has accepted it
    async fn publish(&self, chunk: &ImportChunk) -> Result<()>;

    /// Wait for the next chunk; `None` once the bus is closed and drained
    async fn receive(&self) -> Result<Option<Delivery>>;

    async fn ack(&self, delivery: &Delivery) -> Result<()>;

    /// Return a delivery to the bus for another attempt
    async fn nack(&self, delivery: &Delivery, reason: &str) -> Result<()>;
}

/// Maximum attempts before the in-memory bus drops a chunk
pub const MEMORY_MAX_ATTEMPTS: i32 = 5;

/// Bounded in-process bus for the embedded `run` mode and tests
///
/// Publishing blocks while the buffer is full, which throttles the producer
/// to the pace of the consumers. A chunk stays outstanding from publish until
/// it is acked or dropped, and receivers only see the end of the bus once it
/// is closed with nothing outstanding, so a nack after close still redelivers.
pub struct MemoryChunkBus {
    sender: mpsc::Sender<Delivery>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Delivery>>,
    closed: AtomicBool,
    outstanding: AtomicUsize,
    settled: Notify,
}

impl MemoryChunkBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
            closed: AtomicBool::new(false),
            outstanding: AtomicUsize::new(0),
            settled: Notify::new(),
        }
    }

    /// Stop accepting publishes
    ///
    /// Receivers keep getting buffered and redelivered chunks until every
    /// published chunk has been acked or dropped, then see `None`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.settled.notify_waiters();
    }

    fn settle(&self) {
        let _ = self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        self.settled.notify_waiters();
    }

    fn is_drained(&self) -> bool {
        self.closed.load(Ordering::SeqCst) && self.outstanding.load(Ordering::SeqCst) == 0
    }
}

#[async_trait]
impl ChunkBus for MemoryChunkBus {
    async fn publish(&self, chunk: &ImportChunk) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            bail!("chunk bus is closed");
        }
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let delivery = Delivery {
            id: None,
            attempts: 0,
            chunk: chunk.clone(),
        };
        if self.sender.send(delivery).await.is_err() {
            self.settle();
            bail!("chunk bus receiver dropped");
        }
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>> {
        let mut receiver = self.receiver.lock().await;
        loop {
            let settled = self.settled.notified();
            if self.is_drained() {
                return Ok(None);
            }
            tokio::select! {
                delivery = receiver.recv() => {
                    return Ok(delivery.map(|mut delivery| {
                        delivery.attempts += 1;
                        delivery
                    }));
                },
                _ = settled => {},
            }
        }
    }

    async fn ack(&self, _delivery: &Delivery) -> Result<()> {
        self.settle();
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery, reason: &str) -> Result<()> {
        if delivery.attempts >= MEMORY_MAX_ATTEMPTS {
            tracing::error!(
                job_id = %delivery.chunk.job_id,
                chunk_number = delivery.chunk.chunk_number,
                attempts = delivery.attempts,
                reason,
                "Dropping chunk after max delivery attempts"
            );
            self.settle();
            return Ok(());
        }

        // Workers are the only receivers; a worker blocked on a full buffer
        // here would stall the pool, so redelivery happens off-task.
        let sender = self.sender.clone();
        let delivery = delivery.clone();
        tokio::spawn(async move {
            let chunk_number = delivery.chunk.chunk_number;
            if sender.send(delivery).await.is_err() {
                tracing::warn!(chunk_number, "Chunk bus receiver dropped before redelivery");
            }
        });
        Ok(())
    }
}
