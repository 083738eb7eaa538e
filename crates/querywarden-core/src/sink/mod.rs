//! Durable fallback sinks
//!
//! When the warehouse path is unavailable the exporter hands the untouched
//! batch to a [`FallbackSink`]. A sink failure is the one error the exporter
//! cannot recover from.

mod jsonl;

pub use jsonl::JsonlFallbackSink;

use crate::error::QueryResult;
use crate::warehouse::Record;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// Records grouped by destination table, iterated in sorted table order
pub type TableRecords = BTreeMap<String, Vec<Record>>;

/// Total number of records across all tables
pub fn record_count(tables: &TableRecords) -> usize {
    tables.values().map(Vec::len).sum()
}

/// What a sink stored for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// Records written per table
    pub tables: BTreeMap<String, usize>,
    /// Where the batch landed, for the export metadata
    pub location: String,
}

impl BatchResult {
    pub fn records_written(&self) -> usize {
        self.tables.values().sum()
    }
}

/// Local durable store for batches the warehouse could not take
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FallbackSink: Send + Sync {
    async fn write_batch(&self, customer_id: &str, tables: &TableRecords)
    -> QueryResult<BatchResult>;
}
