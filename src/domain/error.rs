// src/domain/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Poem not found: {0}")]
    PoemNotFound(i64),
    #[error("Network error during {operation}: {message}")]
    Network { operation: String, message: String },
    #[error("Request timed out during {operation}")]
    Timeout { operation: String },
    #[error("Backend error during {operation} (status {status:?}): {message}")]
    Backend {
        operation: String,
        status: Option<u16>,
        message: String,
    },
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Request was superseded by a newer one")]
    Cancelled,
}

impl DomainError {
    pub fn backend(operation: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        DomainError::Backend {
            operation: operation.to_string(),
            status,
            message: message.into(),
        }
    }

    /// Network failures and timeouts may succeed when issued again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DomainError::Network { .. } | DomainError::Timeout { .. }
        )
    }
}
