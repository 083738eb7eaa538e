//! Cost-gated query execution
//!
//! Composes the circuit breaker, the retry policy and the tier limits around
//! a [`QueryService`](crate::warehouse::QueryService).

mod gated;
#[cfg(test)]
mod tests;
mod timeouts;
mod types;

pub use gated::CostGatedExecutor;
pub use timeouts::{DEFAULT_QUERY_TIMEOUT_SECS, Environment, TimeoutPolicy};
pub use types::{ExecutionOptions, ExecutorSettings, QueryOutcome, QueryRequest};
