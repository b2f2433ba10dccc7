//! Bulk product import pipeline
//!
//! A CSV source is streamed by the [`ImportProducer`] into fixed-size
//! chunks on a [`ChunkBus`]. A [`WorkerPool`] of [`ChunkConsumer`]s persists
//! each chunk and updates the job counters, and the [`CompletionDetector`]
//! flips the job to `Completed` once every row is accounted for.
//!
//! ```text
//! CSV file ─▶ producer ─▶ chunk bus ─▶ workers ─▶ products / import_errors
//!                │                         │
//!                └──── import_jobs ◀───────┘
//! ```

pub mod bus;
pub mod completion;
pub mod consumer;
pub mod memory;
pub mod parser;
pub mod producer;
pub mod store;
pub mod types;
pub mod worker;

pub use bus::{ChunkBus, Delivery, MemoryChunkBus};
pub use completion::CompletionDetector;
pub use consumer::{ChunkConsumer, ChunkOutcome};
pub use memory::MemoryStores;
pub use parser::{HeaderError, RowParseError, RowParser};
pub use producer::{ImportHandle, ImportProducer, ProducerOutcome, ProducerSummary};
pub use store::{ErrorStore, ImportStores, JobStore, ProductStore};
pub use types::{
    ImportChunk, ImportError, ImportJob, JobCounters, JobStatus, NewImportError, NewProduct,
    ProductRecord,
};
pub use worker::{WorkerPool, WorkerStats};
