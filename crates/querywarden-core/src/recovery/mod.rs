//! Failure recovery for warehouse calls
//!
//! This module provides the building blocks the executor composes:
//! - Error classification (quota, timeout, connection, other)
//! - Retry policy with exponential backoff and jitter
//! - Circuit breaker pattern for the protected warehouse service

pub mod backoff;
pub mod circuit_breaker;
pub mod retry;

pub use retry::{RetryConfig, RetryError, RetryPolicy, RetryStats};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure category used for retry decisions and breaker accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Quota or rate limit exhausted on the remote side
    Quota,
    /// Deadline expired before the remote answered
    Timeout,
    /// Transport level failure (connection refused, reset, network down)
    Connection,
    /// Anything else; treated as a logic error and never retried
    Other,
}

impl ErrorCategory {
    /// Whether failures in this category may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Stable lowercase name, used in metadata and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quota => "quota",
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Quota => "quota exceeded",
            Self::Timeout => "timed out",
            Self::Connection => "connection failure",
            Self::Other => "unexpected error",
        };
        f.write_str(text)
    }
}

/// Classify a raw failure message.
///
/// Case-insensitive substring match, checked in order: "quota", "timeout",
/// "connection" or "network". Everything else is [`ErrorCategory::Other`].
pub fn classify_message(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();

    if lower.contains("quota") {
        ErrorCategory::Quota
    } else if lower.contains("timeout") {
        ErrorCategory::Timeout
    } else if lower.contains("connection") || lower.contains("network") {
        ErrorCategory::Connection
    } else {
        ErrorCategory::Other
    }
}

/// Errors that can report their failure category
pub trait Classify {
    /// Get the failure category for this error
    fn category(&self) -> ErrorCategory;
}

impl Classify for str {
    fn category(&self) -> ErrorCategory {
        classify_message(self)
    }
}

impl Classify for String {
    fn category(&self) -> ErrorCategory {
        classify_message(self)
    }
}

impl<T: Classify + ?Sized> Classify for &T {
    fn category(&self) -> ErrorCategory {
        (**self).category()
    }
}
