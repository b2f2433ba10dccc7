//! Inventory Common Library
//!
//! Shared types, utilities, and error handling for the inventory workspace.
//!
//! # Overview
//!
//! - **Error Handling**: Common error type and result alias
//! - **Logging**: Centralized `tracing` subscriber setup
//! - **Text**: Bounded-length helpers for persisted diagnostic fields
//!
//! # Example
//!
//! ```no_run
//! use inventory_common::logging::{init_logging, LogConfig};
//! use inventory_common::text::truncate_chars;
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     let message = truncate_chars("a very long message", 6);
//!     tracing::info!(%message, "truncated");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod text;

// Re-export commonly used types
pub use error::{InventoryError, Result};
