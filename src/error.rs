//! Error types for Driah

use thiserror::Error;

/// Main error type for the assistant
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// Validation error (empty term, empty meaning, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Message or entry not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let err = AssistantError::Validation("term must not be empty".into());
        assert_eq!(err.to_string(), "Validation error: term must not be empty");

        let err = AssistantError::NotFound("message 42".into());
        assert_eq!(err.to_string(), "Not found: message 42");
    }

    #[test]
    fn serde_errors_convert() {
        let parse: std::result::Result<Vec<u8>, _> = serde_json::from_str("{nope");
        let err: AssistantError = parse.unwrap_err().into();
        assert!(matches!(err, AssistantError::Serialization(_)));
    }
}
