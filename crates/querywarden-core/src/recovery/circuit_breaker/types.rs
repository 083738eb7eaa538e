//! Circuit breaker types and configuration

use crate::recovery::{Classify, ErrorCategory};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, calls flow normally
    Closed,
    /// Circuit is open, calls fail fast
    Open,
    /// Circuit is half-open, a single probe call tests recovery
    HalfOpen,
}

impl CircuitState {
    pub(super) const CLOSED: u8 = 0;
    pub(super) const OPEN: u8 = 1;
    pub(super) const HALF_OPEN: u8 = 2;

    pub(super) fn from_u8(value: u8) -> Self {
        match value {
            Self::OPEN => Self::Open,
            Self::HALF_OPEN => Self::HalfOpen,
            _ => Self::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// When false, calls pass straight through with no tracking
    pub enabled: bool,
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Time to wait before admitting a half-open probe
    #[serde(with = "humantime_serde")]
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    /// A pass-through breaker
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }
}

/// Error from circuit breaker operations
#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open; the operation was not invoked
    Open { service: String },
    /// Operation ran and failed
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { service } => {
                write!(f, "Circuit breaker open for service: {}", service)
            }
            Self::OperationFailed(e) => write!(f, "Operation failed: {}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for CircuitBreakerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { .. } => None,
            Self::OperationFailed(e) => Some(e),
        }
    }
}

impl<E: Classify> Classify for CircuitBreakerError<E> {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Open { .. } => ErrorCategory::Other,
            Self::OperationFailed(e) => e.category(),
        }
    }
}

/// Monotonic counters kept by a breaker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CircuitMetricsSnapshot {
    pub total_calls: u64,
    pub failed_calls: u64,
    pub circuit_opened_count: u64,
    pub quota_exceeded_count: u64,
    pub timeout_count: u64,
    pub connection_error_count: u64,
}

impl CircuitMetricsSnapshot {
    /// Fraction of calls that failed, 0.0 when nothing ran yet
    pub fn failure_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.failed_calls as f64 / self.total_calls as f64
        }
    }

    pub fn error_breakdown(&self) -> ErrorBreakdown {
        let categorized =
            self.quota_exceeded_count + self.timeout_count + self.connection_error_count;
        ErrorBreakdown {
            quota: self.quota_exceeded_count,
            timeout: self.timeout_count,
            connection: self.connection_error_count,
            other: self.failed_calls.saturating_sub(categorized),
        }
    }
}

/// Failed calls split by category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorBreakdown {
    pub quota: u64,
    pub timeout: u64,
    pub connection: u64,
    pub other: u64,
}

/// Read-only health snapshot of one breaker
#[derive(Debug, Clone, Serialize)]
pub struct CircuitHealth {
    pub service: String,
    /// Effective state: an open circuit whose recovery timeout has elapsed is
    /// reported as half-open, since the next call will be admitted as a probe.
    pub state: CircuitState,
    pub is_healthy: bool,
    pub failure_rate: f64,
    pub consecutive_failures: u32,
    pub error_breakdown: ErrorBreakdown,
    pub metrics: CircuitMetricsSnapshot,
}
