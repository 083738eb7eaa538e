//! QueryWarden Core Library
//!
//! Protects calls to a metered analytical warehouse: a per-service circuit
//! breaker, classified retries with capped backoff, dry-run cost gating per
//! customer tier, and a resilient exporter that degrades to a local fallback
//! sink when the warehouse path is unavailable.

pub mod config;
pub mod cost;
pub mod error;
pub mod executor;
pub mod export;
pub mod recovery;
pub mod sink;
pub mod warehouse;

// Re-export commonly used types
pub use config::{ConfigLoader, QueryWardenConfig, load_config};
pub use cost::{CostModel, CustomerTier, QueryCostEstimate, TierLimits, TierTable};
pub use error::{QueryError, QueryResult};
pub use executor::{
    CostGatedExecutor, Environment, ExecutionOptions, ExecutorSettings, QueryOutcome,
    QueryRequest, TimeoutPolicy,
};
pub use export::{
    ExportDestination, ExportResult, ExportStatus, HealthReport, HealthStatus, ResilientExporter,
};
pub use recovery::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitHealth, CircuitState,
};
pub use recovery::{Classify, ErrorCategory, RetryConfig, RetryPolicy, RetryStats};
pub use sink::{BatchResult, FallbackSink, JsonlFallbackSink, TableRecords};
pub use warehouse::{QueryParam, QueryService, Record, ResultSet, WarehouseError};
