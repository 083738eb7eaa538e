//! Constructor methods for QueryError

use super::types::QueryError;
use crate::recovery::{Classify, ErrorCategory, RetryError};
use crate::warehouse::WarehouseError;

impl QueryError {
    pub fn circuit_open(service: impl Into<String>) -> Self {
        Self::CircuitOpen {
            service: service.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    pub fn sink(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// Wrap a failed dry run
    pub fn estimation(error: &WarehouseError) -> Self {
        Self::Estimation {
            category: error.category(),
            detail: error.message().to_string(),
        }
    }
}

impl From<RetryError<WarehouseError>> for QueryError {
    fn from(error: RetryError<WarehouseError>) -> Self {
        let attempts = error.attempts();
        match error {
            RetryError::Cancelled { .. } => Self::Cancelled,
            RetryError::Exhausted { last_error, .. } => Self::RemoteExecution {
                category: last_error.category(),
                attempts,
                exhausted: true,
                detail: last_error.message().to_string(),
            },
            RetryError::Permanent { error, .. } => Self::RemoteExecution {
                category: error.category(),
                attempts,
                exhausted: false,
                detail: error.message().to_string(),
            },
        }
    }
}

impl From<std::io::Error> for QueryError {
    fn from(error: std::io::Error) -> Self {
        Self::sink("I/O failure writing fallback batch", error.to_string())
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(error: serde_json::Error) -> Self {
        Self::sink("failed to encode fallback record", error.to_string())
    }
}
