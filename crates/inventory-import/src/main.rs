//! Inventory Import - Main entry point

use clap::Parser;
use inventory_common::logging::{init_logging, LogConfig, LogLevel};
use inventory_import::Cli;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .log_file_prefix("inventory-import")
        .filter_directives("inventory_import=debug,sqlx=warn")
        .build();

    // Environment variables take precedence over the defaults above
    let log_config = match log_config.clone().merge_env() {
        Ok(merged) => merged,
        Err(e) => {
            eprintln!("Ignoring invalid logging environment: {}", e);
            log_config
        },
    };

    // The guard flushes the file writer on drop; keep it for the whole run
    let _guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {}", e);
            None
        },
    };

    if let Err(e) = inventory_import::cli::run(cli).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}
