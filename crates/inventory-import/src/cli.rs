//! Command-line interface
//!
//! `worker` and `import` run as separate processes sharing the durable
//! Postgres queue. `run` does both in one process over an in-memory bus.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::features::imports::{
    commands::{cancel_import, start_import},
    queries::{get_job, list_errors},
    CancelImportCommand, CancelImportError, GetJobError, GetJobQuery, ListJobErrorsError,
    ListJobErrorsQuery, StartImportCommand, StartImportError,
};
use crate::import::{
    ChunkBus, ChunkConsumer, ImportProducer, ImportStores, MemoryChunkBus, MemoryStores,
    WorkerPool,
};

/// Bulk CSV product importer
#[derive(Parser, Debug)]
#[command(name = "inventory-import")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Consume chunks from the durable queue until interrupted
    Worker {
        /// Concurrent chunk consumers (defaults to IMPORT_WORKER_COUNT)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Start an import; chunks go to the durable queue
    Import {
        /// CSV file, relative to IMPORT_DATA_DIR or absolute
        file: String,

        /// Wait until the job reaches a terminal status
        #[arg(long)]
        wait: bool,
    },

    /// Import a file end to end in this process
    Run {
        /// CSV file, relative to IMPORT_DATA_DIR or absolute
        file: String,

        /// Keep jobs, errors and products in memory instead of Postgres
        #[arg(long)]
        in_memory: bool,
    },

    /// Show an import job
    Status {
        job_id: Uuid,
    },

    /// List the error log of an import job
    Errors {
        job_id: Uuid,

        /// Page size
        #[arg(short, long, default_value_t = list_errors::DEFAULT_PAGE_SIZE)]
        limit: i64,

        /// Rows to skip
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Cancel a processing import job
    Cancel {
        job_id: Uuid,
    },

    /// Apply database migrations
    Migrate,
}

/// Interval between status polls for `import --wait`
const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(cli: Cli) -> AppResult<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Worker { workers } => run_worker(&config, workers).await,
        Commands::Import { file, wait } => run_import(&config, file, wait).await,
        Commands::Run { file, in_memory } => run_embedded(&config, file, in_memory).await,
        Commands::Status { job_id } => {
            let stores = connect_stores(&config).await?.1;
            print_job(&stores, job_id).await
        },
        Commands::Errors {
            job_id,
            limit,
            offset,
        } => {
            let stores = connect_stores(&config).await?.1;
            let query = ListJobErrorsQuery {
                job_id,
                limit: Some(limit),
                offset: Some(offset),
            };
            let response = list_errors::handle(&stores, query).await.map_err(|e| match e {
                ListJobErrorsError::NotFound => AppError::NotFound(format!("import job {}", job_id)),
                ListJobErrorsError::Store(e) => AppError::Pipeline(e),
                other => AppError::InvalidArgument(other.to_string()),
            })?;
            print_json(&response)
        },
        Commands::Cancel { job_id } => {
            let stores = connect_stores(&config).await?.1;
            let response = cancel_import::handle(&stores, CancelImportCommand { job_id })
                .await
                .map_err(|e| match e {
                    CancelImportError::NotFound(id) => AppError::NotFound(format!("import job {}", id)),
                    CancelImportError::Store(e) => AppError::Pipeline(e),
                    other => AppError::InvalidArgument(other.to_string()),
                })?;
            print_json(&response)
        },
        Commands::Migrate => {
            let pool = db::create_pool(&config.database).await?;
            db::run_migrations(&pool).await
        },
    }
}

async fn connect_stores(config: &Config) -> AppResult<(sqlx::PgPool, ImportStores)> {
    let pool = db::create_pool(&config.database).await?;
    db::health_check(&pool).await?;
    let stores = db::postgres_stores(pool.clone(), config.import.store_batch_size);
    Ok((pool, stores))
}

async fn run_worker(config: &Config, workers: Option<usize>) -> AppResult<()> {
    let (pool, stores) = connect_stores(config).await?;
    let bus: Arc<dyn ChunkBus> = Arc::new(db::PgChunkQueue::new(pool, config.queue.clone()));
    let size = workers.unwrap_or(config.import.worker_count);

    let shutdown = CancellationToken::new();
    let workers = WorkerPool::spawn(size, bus, ChunkConsumer::new(stores), shutdown.clone());

    tracing::info!(
        routing_key = %config.queue.routing_key,
        workers = size,
        "Waiting for import chunks; press Ctrl-C to stop"
    );
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    workers.shutdown();
    let stats = workers.join().await;
    println!(
        "Consumed {} chunks ({} rows stored, {} rows failed)",
        stats.chunks_consumed, stats.rows_processed, stats.rows_failed
    );
    Ok(())
}

async fn run_import(config: &Config, file: String, wait: bool) -> AppResult<()> {
    let (pool, stores) = connect_stores(config).await?;
    let bus: Arc<dyn ChunkBus> = Arc::new(db::PgChunkQueue::new(pool, config.queue.clone()));
    let producer = ImportProducer::new(stores.clone(), bus, config.import.clone());

    let (response, handle) = start(&producer, config, file).await?;
    println!("Started import job {}", response.job_id);

    // The producer task must finish before the process exits
    let summary = handle.wait().await?;
    tracing::info!(
        job_id = %summary.job_id,
        rows_read = summary.rows_read,
        chunks = summary.chunks_published,
        outcome = ?summary.outcome,
        "Import source published"
    );

    if wait {
        loop {
            let details = job_details(&stores, response.job_id).await?;
            if details.job.is_terminal() {
                break;
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    print_job(&stores, response.job_id).await
}

async fn run_embedded(config: &Config, file: String, in_memory: bool) -> AppResult<()> {
    let stores = if in_memory {
        MemoryStores::new().stores()
    } else {
        connect_stores(config).await?.1
    };

    let memory_bus = Arc::new(MemoryChunkBus::new(config.import.bus_capacity));
    let bus: Arc<dyn ChunkBus> = memory_bus.clone();

    let workers = WorkerPool::spawn(
        config.import.worker_count,
        bus.clone(),
        ChunkConsumer::new(stores.clone()),
        CancellationToken::new(),
    );
    let producer = ImportProducer::new(stores.clone(), bus, config.import.clone());

    let (response, handle) = start(&producer, config, file).await?;
    println!("Started import job {}", response.job_id);

    handle.wait().await?;
    // Workers exit once every published chunk has been consumed
    memory_bus.close();
    let stats = workers.join().await;
    tracing::debug!(chunks = stats.chunks_consumed, "Embedded import drained");

    print_job(&stores, response.job_id).await
}

async fn start(
    producer: &ImportProducer,
    config: &Config,
    file: String,
) -> AppResult<(start_import::StartImportResponse, crate::import::ImportHandle)> {
    start_import::handle(producer, &config.import, StartImportCommand { file })
        .await
        .map_err(|e| match e {
            e @ StartImportError::FileRequired => AppError::InvalidArgument(e.to_string()),
            StartImportError::Pipeline(e) => AppError::Pipeline(e),
        })
}

async fn job_details(stores: &ImportStores, job_id: Uuid) -> AppResult<get_job::JobDetails> {
    get_job::handle(stores, GetJobQuery { job_id })
        .await
        .map_err(|e| match e {
            GetJobError::NotFound => AppError::NotFound(format!("import job {}", job_id)),
            GetJobError::Store(e) => AppError::Pipeline(e),
        })
}

async fn print_job(stores: &ImportStores, job_id: Uuid) -> AppResult<()> {
    let details = job_details(stores, job_id).await?;
    print_json(&details)
}

fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(inventory_common::InventoryError::from)?;
    println!("{}", rendered);
    Ok(())
}
