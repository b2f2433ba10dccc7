//! Import service error types

use thiserror::Error;

/// Result type alias for top-level import operations
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Inventory error: {0}")]
    Common(#[from] inventory_common::InventoryError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Import pipeline error: {0:#}")]
    Pipeline(#[from] anyhow::Error),
}

impl AppError {
    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::InvalidArgument(_) => 2,
            AppError::NotFound(_) => 3,
            AppError::Common(inventory_common::InventoryError::Config(_)) => 78,
            _ => 1,
        }
    }
}
