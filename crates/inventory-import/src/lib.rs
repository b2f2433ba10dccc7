//! Inventory Import Library
//!
//! Asynchronous bulk import of product catalogues from CSV files.
//!
//! # Overview
//!
//! - **Producer**: streams a CSV source into fixed-size chunks without
//!   loading the file into memory
//! - **Chunk bus**: durable Postgres queue between processes, or a bounded
//!   in-memory channel inside one process
//! - **Consumers**: a worker pool that bulk-inserts each chunk and falls back
//!   to row-by-row inserts so one bad row cannot sink a chunk
//! - **Job tracking**: atomic progress counters, a bounded per-row error log
//!   and exactly-once completion detection
//!
//! # Example
//!
//! ```no_run
//! use inventory_import::config::ImportConfig;
//! use inventory_import::import::{
//!     ChunkConsumer, ImportProducer, MemoryChunkBus, MemoryStores, WorkerPool,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let stores = MemoryStores::new().stores();
//!     let bus = Arc::new(MemoryChunkBus::new(32));
//!
//!     let workers = WorkerPool::spawn(
//!         4,
//!         bus.clone(),
//!         ChunkConsumer::new(stores.clone()),
//!         CancellationToken::new(),
//!     );
//!     let producer = ImportProducer::new(stores, bus.clone(), ImportConfig::default());
//!
//!     let handle = producer.start_import("products.csv").await?;
//!     handle.wait().await?;
//!     bus.close();
//!     workers.join().await;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod import;

// Re-export commonly used types
pub use cli::Cli;
pub use error::{AppError, AppResult};
