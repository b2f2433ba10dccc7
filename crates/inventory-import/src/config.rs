//! Configuration management
//!
//! Values come from a `.env` file (if present) and the process environment,
//! falling back to the `DEFAULT_*` constants below.

use inventory_common::{InventoryError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Database Configuration Constants
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/inventory";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

// ============================================================================
// Import Pipeline Constants
// ============================================================================

/// Rows per published chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Concurrent chunk consumers per process.
pub const DEFAULT_WORKER_COUNT: usize = 5;

/// Rows per INSERT statement inside one bulk insert transaction.
pub const DEFAULT_STORE_BATCH_SIZE: usize = 500;

/// Extra publish attempts after the first failure.
pub const DEFAULT_PUBLISH_RETRIES: u32 = 3;

/// Delay between publish attempts in milliseconds.
pub const DEFAULT_PUBLISH_RETRY_DELAY_MS: u64 = 200;

/// Parsed rows buffered between the file reader and the publisher.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4096;

/// Chunks buffered by the in-process bus before publish blocks.
pub const DEFAULT_BUS_CAPACITY: usize = 32;

// ============================================================================
// Queue Constants
// ============================================================================

/// Routing key the chunk queue is bound to.
pub const DEFAULT_ROUTING_KEY: &str = "product.import";

/// Idle poll interval of the durable queue in milliseconds.
pub const DEFAULT_QUEUE_POLL_INTERVAL_MS: u64 = 250;

/// Seconds before an unacknowledged message is redelivered.
pub const DEFAULT_QUEUE_VISIBILITY_TIMEOUT_SECS: u64 = 300;

/// What the producer does with rows that fail to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ParseFailurePolicy {
    /// Record an import error and count the row as failed
    #[default]
    Count,
    /// Log the row and drop it; it counts toward the total only
    LogOnly,
}

impl FromStr for ParseFailurePolicy {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "count" | "count-as-failed" => Ok(ParseFailurePolicy::Count),
            "log-only" | "log_only" | "log" => Ok(ParseFailurePolicy::LogOnly),
            other => Err(InventoryError::config(format!(
                "Invalid parse failure policy: {} (expected count or log-only)",
                other
            ))),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub import: ImportConfig,
    pub queue: QueueConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Producer and consumer tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub chunk_size: usize,
    pub worker_count: usize,
    pub store_batch_size: usize,
    /// Relative source names resolve against this directory
    pub data_dir: PathBuf,
    pub parse_failures: ParseFailurePolicy,
    pub publish_retries: u32,
    pub publish_retry_delay_ms: u64,
    pub channel_capacity: usize,
    pub bus_capacity: usize,
}

/// Durable chunk queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub routing_key: String,
    pub poll_interval_ms: u64,
    pub visibility_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            worker_count: DEFAULT_WORKER_COUNT,
            store_batch_size: DEFAULT_STORE_BATCH_SIZE,
            data_dir: PathBuf::from("."),
            parse_failures: ParseFailurePolicy::default(),
            publish_retries: DEFAULT_PUBLISH_RETRIES,
            publish_retry_delay_ms: DEFAULT_PUBLISH_RETRY_DELAY_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            routing_key: DEFAULT_ROUTING_KEY.to_string(),
            poll_interval_ms: DEFAULT_QUEUE_POLL_INTERVAL_MS,
            visibility_timeout_secs: DEFAULT_QUEUE_VISIBILITY_TIMEOUT_SECS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            import: ImportConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl ImportConfig {
    pub fn publish_retry_delay(&self) -> Duration {
        Duration::from_millis(self.publish_retry_delay_ms)
    }

    /// Resolve a caller-supplied source name to a filesystem path
    pub fn resolve_source(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS)?,
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", DEFAULT_DATABASE_MIN_CONNECTIONS)?,
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                )?,
                idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS)?,
            },
            import: ImportConfig {
                chunk_size: env_or("IMPORT_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
                worker_count: env_or("IMPORT_WORKER_COUNT", DEFAULT_WORKER_COUNT)?,
                store_batch_size: env_or("IMPORT_STORE_BATCH_SIZE", DEFAULT_STORE_BATCH_SIZE)?,
                data_dir: std::env::var("IMPORT_DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(".")),
                parse_failures: env_or("IMPORT_PARSE_FAILURES", ParseFailurePolicy::default())?,
                publish_retries: env_or("IMPORT_PUBLISH_RETRIES", DEFAULT_PUBLISH_RETRIES)?,
                publish_retry_delay_ms: env_or(
                    "IMPORT_PUBLISH_RETRY_DELAY_MS",
                    DEFAULT_PUBLISH_RETRY_DELAY_MS,
                )?,
                channel_capacity: env_or("IMPORT_CHANNEL_CAPACITY", DEFAULT_CHANNEL_CAPACITY)?,
                bus_capacity: env_or("IMPORT_BUS_CAPACITY", DEFAULT_BUS_CAPACITY)?,
            },
            queue: QueueConfig {
                routing_key: std::env::var("IMPORT_ROUTING_KEY")
                    .unwrap_or_else(|_| DEFAULT_ROUTING_KEY.to_string()),
                poll_interval_ms: env_or(
                    "IMPORT_QUEUE_POLL_INTERVAL_MS",
                    DEFAULT_QUEUE_POLL_INTERVAL_MS,
                )?,
                visibility_timeout_secs: env_or(
                    "IMPORT_QUEUE_VISIBILITY_TIMEOUT_SECS",
                    DEFAULT_QUEUE_VISIBILITY_TIMEOUT_SECS,
                )?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(InventoryError::config("Database URL cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(InventoryError::config(
                "Database max_connections must be greater than 0",
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(InventoryError::config(format!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        if self.import.chunk_size == 0 {
            return Err(InventoryError::config("Import chunk size must be greater than 0"));
        }

        if self.import.worker_count == 0 {
            return Err(InventoryError::config("Import worker count must be greater than 0"));
        }

        if self.import.store_batch_size == 0 {
            return Err(InventoryError::config(
                "Import store batch size must be greater than 0",
            ));
        }

        if self.import.channel_capacity == 0 || self.import.bus_capacity == 0 {
            return Err(InventoryError::config("Import buffer capacities must be greater than 0"));
        }

        if self.queue.routing_key.trim().is_empty() {
            return Err(InventoryError::config("Queue routing key cannot be empty"));
        }

        if self.import.worker_count as u32 > self.database.max_connections {
            tracing::warn!(
                workers = self.import.worker_count,
                max_connections = self.database.max_connections,
                "More import workers than database connections; workers will queue on the pool"
            );
        }

        Ok(())
    }
}

/// Read `key` from the environment, falling back to `default` when unset
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| InventoryError::config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}
