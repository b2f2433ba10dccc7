//! Error types shared across the inventory workspace

use thiserror::Error;

/// Result type alias for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Main error type for the inventory workspace
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl InventoryError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        InventoryError::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = InventoryError::config("chunk size must be greater than 0");
        assert_eq!(
            err.to_string(),
            "Configuration error: chunk size must be greater than 0"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: InventoryError = io.into();
        assert!(matches!(err, InventoryError::Io(_)));
        assert!(err.to_string().contains("missing.csv"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: InventoryError = json.into();
        assert!(matches!(err, InventoryError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error:"));
    }
}
