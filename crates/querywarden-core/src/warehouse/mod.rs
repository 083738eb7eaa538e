//! Remote warehouse collaborator interface
//!
//! The metered query service is external. This module only describes what
//! the execution layer needs from it: a side-effect free dry run, the real
//! execution with a deadline, and a cheap connectivity probe.

use crate::recovery::{Classify, ErrorCategory, classify_message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// One exported or returned row
pub type Record = serde_json::Map<String, Value>;

/// Named query parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParam {
    pub name: String,
    pub value: Value,
}

impl QueryParam {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Rows returned by an execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub rows: Vec<Record>,
    /// Rows written by DML statements
    #[serde(default)]
    pub rows_affected: u64,
}

impl ResultSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows: Vec::new(),
            rows_affected,
        }
    }
}

/// Raw failure reported by the warehouse.
///
/// The message may contain service internals; it is classified and logged
/// but never shown to callers verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct WarehouseError {
    message: String,
}

impl WarehouseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Deadline expired on the client side
    pub fn timeout(after: Duration) -> Self {
        Self::new(format!("query timeout after {:.1}s", after.as_secs_f64()))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Classify for WarehouseError {
    fn category(&self) -> ErrorCategory {
        classify_message(&self.message)
    }
}

/// Metered analytical query service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Dry run: bytes the query would scan. No side effects.
    async fn estimate_cost(&self, query: &str) -> Result<u64, WarehouseError>;

    /// Run the query. Implementations should honour `timeout`; the executor
    /// enforces it as well.
    async fn execute(
        &self,
        query: &str,
        params: &[QueryParam],
        timeout: Duration,
    ) -> Result<ResultSet, WarehouseError>;

    /// Lightweight connectivity check used by health reporting
    async fn ping(&self) -> Result<(), WarehouseError>;
}
