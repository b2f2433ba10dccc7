//! Logging configuration and initialization
//!
//! Every binary in the workspace installs its `tracing` subscriber through
//! [`init_logging`]. Output can go to the console, to a daily rolling file, or
//! both, formatted as human-readable text or JSON.
//!
//! Library code logs with structured fields and never prints:
//!
//! ```rust
//! use tracing::{info, warn};
//!
//! # let (job_id, chunk_number, rows) = ("job", 0, 1000);
//! info!(%job_id, chunk_number, rows, "Published chunk");
//! warn!(%job_id, "Batch insert failed, falling back to row-by-row");
//! ```
//!
//! # Environment
//!
//! - `LOG_LEVEL`: trace, debug, info, warn, error
//! - `LOG_OUTPUT`: console, file, both
//! - `LOG_FORMAT`: text, json
//! - `LOG_DIR`: directory for log files
//! - `LOG_FILE_PREFIX`: file name prefix
//! - `LOG_FILTER`: extra directives, e.g. `sqlx=warn,inventory_import=debug`
//! - `LOG_INCLUDE_LOCATION`, `LOG_INCLUDE_THREAD_IDS`, `LOG_INCLUDE_TARGETS`: true/false

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

/// Output target for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

impl LogOutput {
    fn writes_console(self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl std::str::FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            _ => Err(anyhow::anyhow!("Invalid log output: {}", s)),
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub output: LogOutput,
    pub format: LogFormat,
    /// Directory for log files (only used when output includes file)
    pub log_dir: PathBuf,
    /// Log file name prefix, e.g. "inventory-import" -> "inventory-import.2026-10-18"
    pub log_file_prefix: String,
    /// Additional filter directives, e.g. "sqlx=warn,inventory_import=debug"
    pub filter_directives: Option<String>,
    pub include_location: bool,
    pub include_thread_ids: bool,
    pub include_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            output: LogOutput::Console,
            format: LogFormat::Text,
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: "inventory".to_string(),
            filter_directives: None,
            include_location: false,
            include_thread_ids: false,
            include_targets: true,
        }
    }
}

impl LogConfig {
    /// Load configuration from `LOG_*` environment variables on top of defaults
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    /// Override fields of `self` with whatever `LOG_*` variables are set
    pub fn merge_env(mut self) -> Result<Self> {
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.level = level.parse()?;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.output = output.parse()?;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.format = format.parse()?;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = std::env::var("LOG_FILE_PREFIX") {
            self.log_file_prefix = prefix;
        }
        if let Ok(filter) = std::env::var("LOG_FILTER") {
            self.filter_directives = Some(filter);
        }
        self.include_location = env_flag("LOG_INCLUDE_LOCATION", self.include_location);
        self.include_thread_ids = env_flag("LOG_INCLUDE_THREAD_IDS", self.include_thread_ids);
        self.include_targets = env_flag("LOG_INCLUDE_TARGETS", self.include_targets);

        Ok(self)
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }
}

/// `true`/`1`/`yes` or `false`/`0`/`no`; anything else keeps `current`
fn env_flag(key: &str, current: bool) -> bool {
    match std::env::var(key).map(|v| v.trim().to_lowercase()) {
        Ok(v) if matches!(v.as_str(), "true" | "1" | "yes") => true,
        Ok(v) if matches!(v.as_str(), "false" | "0" | "no") => false,
        _ => current,
    }
}

/// Builder for LogConfig
#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    pub fn log_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.log_file_prefix = prefix.into();
        self
    }

    pub fn filter_directives(mut self, filter: impl Into<String>) -> Self {
        self.config.filter_directives = Some(filter.into());
        self
    }

    pub fn include_location(mut self, include: bool) -> Self {
        self.config.include_location = include;
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

/// Keeps the non-blocking file writer flushing; drop it only at shutdown.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize the global subscriber. Call once at startup and hold the guard.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard> {
    let mut filter =
        EnvFilter::from_default_env().add_directive(config.level.to_tracing_level().into());

    if let Some(ref directives) = config.filter_directives {
        for directive in directives.split(',').filter(|d| !d.trim().is_empty()) {
            filter = filter.add_directive(
                directive
                    .trim()
                    .parse()
                    .context("Failed to parse filter directive")?,
            );
        }
    }

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut file_guard = None;

    if config.output.writes_console() {
        layers.push(fmt_layer(config, std::io::stderr, true));
    }

    if config.output.writes_file() {
        std::fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;
        let appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);
        layers.push(fmt_layer(config, non_blocking, false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingGuard { _file: file_guard })
}

fn fmt_layer<W>(config: &LogConfig, writer: W, ansi: bool) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(config.include_targets)
        .with_thread_ids(config.include_thread_ids)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(FmtSpan::CLOSE);

    match config.format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!(" Info ".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_output_targets() {
        let both: LogOutput = "all".parse().unwrap();
        assert!(both.writes_console() && both.writes_file());
        let file: LogOutput = "file".parse().unwrap();
        assert!(!file.writes_console() && file.writes_file());
        assert!("syslog".parse::<LogOutput>().is_err());
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::Both)
            .format(LogFormat::Json)
            .log_dir("/var/log/inventory")
            .log_file_prefix("inventory-import")
            .filter_directives("sqlx=warn")
            .build();

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.output, LogOutput::Both);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/inventory"));
        assert_eq!(config.log_file_prefix, "inventory-import");
        assert_eq!(config.filter_directives.as_deref(), Some("sqlx=warn"));
    }
}
