//! Shared fakes for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use querywarden_core::sink::TableRecords;
use querywarden_core::{QueryParam, QueryService, Record, ResultSet, WarehouseError};
use serde_json::json;

/// Warehouse that answers `execute` from a script, then succeeds
pub struct ScriptedWarehouse {
    bytes_scanned: u64,
    script: Mutex<VecDeque<String>>,
    always_fail: Option<String>,
    execute_calls: AtomicU32,
    queries: Mutex<Vec<String>>,
}

impl ScriptedWarehouse {
    pub fn healthy() -> Self {
        Self {
            bytes_scanned: 1 << 20,
            script: Mutex::new(VecDeque::new()),
            always_fail: None,
            execute_calls: AtomicU32::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Fail with each message in turn, then succeed
    pub fn failing_first(messages: &[&str]) -> Self {
        let warehouse = Self::healthy();
        warehouse
            .script
            .lock()
            .extend(messages.iter().map(|m| m.to_string()));
        warehouse
    }

    pub fn always_failing(message: &str) -> Self {
        Self {
            always_fail: Some(message.to_string()),
            ..Self::healthy()
        }
    }

    pub fn execute_calls(&self) -> u32 {
        self.execute_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl QueryService for ScriptedWarehouse {
    async fn estimate_cost(&self, _query: &str) -> Result<u64, WarehouseError> {
        Ok(self.bytes_scanned)
    }

    async fn execute(
        &self,
        query: &str,
        params: &[QueryParam],
        _timeout: Duration,
    ) -> Result<ResultSet, WarehouseError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(query.to_string());

        if let Some(message) = &self.always_fail {
            return Err(WarehouseError::new(message.clone()));
        }
        if let Some(message) = self.script.lock().pop_front() {
            return Err(WarehouseError::new(message));
        }

        let rows = params
            .first()
            .and_then(|p| p.value.as_array())
            .map_or(0, |rows| rows.len() as u64);
        Ok(ResultSet::affected(rows))
    }

    async fn ping(&self) -> Result<(), WarehouseError> {
        match &self.always_fail {
            Some(message) => Err(WarehouseError::new(message.clone())),
            None => Ok(()),
        }
    }
}

pub fn records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            json!({ "event_id": format!("evt-{i}"), "value": i })
                .as_object()
                .cloned()
                .unwrap()
        })
        .collect()
}

pub fn single_table(table: &str, count: usize) -> TableRecords {
    let mut tables = TableRecords::new();
    tables.insert(table.to_string(), records(count));
    tables
}
