//! Scripted in-process warehouse for `querywarden simulate`

use async_trait::async_trait;
use parking_lot::Mutex;
use querywarden_core::{QueryParam, QueryService, ResultSet, WarehouseError};
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Outcome of one scripted execute call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ok,
    Timeout,
    Quota,
    Connection,
    Error,
}

impl Step {
    fn into_result(self, rows: u64) -> Result<ResultSet, WarehouseError> {
        let message = match self {
            Self::Ok => return Ok(ResultSet::affected(rows)),
            Self::Timeout => "simulated query timeout",
            Self::Quota => "simulated quota exceeded for project",
            Self::Connection => "simulated connection reset",
            Self::Error => "simulated syntax error at [1:1]",
        };
        Err(WarehouseError::new(message))
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ok" | "success" => Ok(Self::Ok),
            "timeout" => Ok(Self::Timeout),
            "quota" => Ok(Self::Quota),
            "connection" | "network" => Ok(Self::Connection),
            "error" | "other" => Ok(Self::Error),
            other => Err(format!("unknown simulation step: {other}")),
        }
    }
}

/// Parse a comma-separated script
pub fn parse_script<S: AsRef<str>>(steps: &[S]) -> Result<Vec<Step>, String> {
    steps
        .iter()
        .filter(|s| !s.as_ref().trim().is_empty())
        .map(|s| s.as_ref().parse())
        .collect()
}

/// Warehouse that follows a script, then keeps answering with `after`
pub struct SimulatedWarehouse {
    bytes_per_query: u64,
    script: Mutex<VecDeque<Step>>,
    after: Step,
    execute_calls: AtomicU64,
}

impl SimulatedWarehouse {
    pub fn scripted(bytes_per_query: u64, script: Vec<Step>) -> Self {
        Self {
            bytes_per_query,
            script: Mutex::new(script.into()),
            after: Step::Ok,
            execute_calls: AtomicU64::new(0),
        }
    }

    pub fn always(bytes_per_query: u64, step: Step) -> Self {
        Self {
            after: step,
            ..Self::scripted(bytes_per_query, Vec::new())
        }
    }

    pub fn execute_calls(&self) -> u64 {
        self.execute_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl QueryService for SimulatedWarehouse {
    async fn estimate_cost(&self, _query: &str) -> Result<u64, WarehouseError> {
        Ok(self.bytes_per_query)
    }

    async fn execute(
        &self,
        query: &str,
        params: &[QueryParam],
        _timeout: Duration,
    ) -> Result<ResultSet, WarehouseError> {
        self.execute_calls.fetch_add(1, Ordering::Relaxed);
        let step = self.script.lock().pop_front().unwrap_or(self.after);
        let rows = params
            .iter()
            .find_map(|p| p.value.as_array())
            .map_or(0, |rows| rows.len() as u64);

        tracing::debug!(query, ?step, "simulated execute");
        step.into_result(rows)
    }

    async fn ping(&self) -> Result<(), WarehouseError> {
        match self.after {
            Step::Connection | Step::Timeout => Err(WarehouseError::new("simulated ping failure")),
            _ => Ok(()),
        }
    }
}
