//! Core error type

use crate::cost::CustomerTier;
use crate::recovery::{Classify, ErrorCategory};
use thiserror::Error;

/// Result type alias for QueryWarden operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Main error type for the execution layer
#[derive(Error, Debug, Clone)]
pub enum QueryError {
    /// Circuit breaker rejected the call; the warehouse was not contacted
    #[error("Circuit breaker open for service: {service}")]
    CircuitOpen { service: String },

    /// Dry-run estimate exceeds the tier's cost cap
    #[error("Query cost ${cost_usd:.2} exceeds the {tier} tier limit of ${cap_usd:.2}")]
    CostLimitExceeded {
        cost_usd: f64,
        cap_usd: f64,
        tier: CustomerTier,
    },

    /// Dry-run estimation failed
    #[error("Cost estimation failed: {category}")]
    Estimation {
        category: ErrorCategory,
        detail: String,
    },

    /// The real execution failed after the retry policy gave up
    #[error("Remote execution failed after {attempts} attempt(s): {category}")]
    RemoteExecution {
        category: ErrorCategory,
        attempts: u32,
        exhausted: bool,
        detail: String,
    },

    /// The caller cancelled the operation
    #[error("Query was cancelled")]
    Cancelled,

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// The fallback sink could not store the batch
    #[error("Fallback sink error: {message}")]
    Sink { message: String, detail: String },
}

impl QueryError {
    /// Get the error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CircuitOpen { .. } => "QW_CIRCUIT_OPEN",
            Self::CostLimitExceeded { .. } => "QW_COST_LIMIT",
            Self::Estimation { .. } => "QW_ESTIMATION",
            Self::RemoteExecution { .. } => "QW_REMOTE_EXECUTION",
            Self::Cancelled => "QW_CANCELLED",
            Self::Config { .. } => "QW_CONFIG",
            Self::Sink { .. } => "QW_SINK",
        }
    }

    /// Unsanitized detail for logs, when there is one
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Estimation { detail, .. }
            | Self::RemoteExecution { detail, .. }
            | Self::Sink { detail, .. } => Some(detail),
            Self::Config { context, .. } => context.as_deref(),
            _ => None,
        }
    }

    /// Reason recorded on an export that was redirected to the fallback sink
    pub fn fallback_reason(&self) -> String {
        match self {
            Self::CircuitOpen { .. } => "circuit breaker open".to_string(),
            Self::CostLimitExceeded {
                cost_usd, cap_usd, ..
            } => format!(
                "query cost limit exceeded (${:.2} > ${:.2})",
                cost_usd, cap_usd
            ),
            Self::Estimation { category, .. } => {
                format!("cost estimation failed ({})", category.as_str())
            }
            Self::RemoteExecution {
                category,
                attempts,
                exhausted: true,
                ..
            } => format!(
                "retries exhausted after {} attempts ({})",
                attempts,
                category.as_str()
            ),
            Self::RemoteExecution { category, .. } => {
                format!("remote execution failed ({})", category.as_str())
            }
            Self::Cancelled => "export cancelled".to_string(),
            Self::Config { .. } => "configuration error".to_string(),
            Self::Sink { .. } => "fallback sink error".to_string(),
        }
    }
}

impl Classify for QueryError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Estimation { category, .. } | Self::RemoteExecution { category, .. } => {
                *category
            }
            _ => ErrorCategory::Other,
        }
    }
}
