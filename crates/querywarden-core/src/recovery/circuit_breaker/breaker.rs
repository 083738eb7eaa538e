//! Circuit breaker implementation
//!
//! State lives in an atomic so the closed fast path never takes the lock and
//! so the open → half-open handover can be claimed with a single
//! compare-and-swap. The mutex guards the bookkeeping fields and is released
//! before the protected operation runs.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use tokio::time::Instant;

use super::types::{
    CircuitBreakerConfig, CircuitBreakerError, CircuitHealth, CircuitMetricsSnapshot,
    CircuitState,
};
use crate::recovery::{Classify, ErrorCategory};

/// How a call got through the breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Admitted while closed
    Normal,
    /// The single half-open trial call
    Probe,
}

#[derive(Debug, Default)]
struct BreakerInner {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct CircuitMetrics {
    total_calls: AtomicU64,
    failed_calls: AtomicU64,
    circuit_opened_count: AtomicU64,
    quota_exceeded_count: AtomicU64,
    timeout_count: AtomicU64,
    connection_error_count: AtomicU64,
}

/// Circuit breaker protecting one remote service
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Service name (for logging and metrics)
    service: String,
    config: CircuitBreakerConfig,
    state: AtomicU8,
    inner: Mutex<BreakerInner>,
    metrics: CircuitMetrics,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default config
    pub fn new(service: impl Into<String>) -> Self {
        Self::with_config(service, CircuitBreakerConfig::default())
    }

    /// Create a new circuit breaker with custom config
    pub fn with_config(service: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            service: service.into(),
            config,
            state: AtomicU8::new(CircuitState::CLOSED),
            inner: Mutex::new(BreakerInner::default()),
            metrics: CircuitMetrics::default(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get the raw current state
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        if !self.config.enabled {
            return operation().await.map_err(CircuitBreakerError::OperationFailed);
        }

        let Some(admission) = self.try_admit() else {
            tracing::debug!(circuit = %self.service, "circuit open, failing fast");
            return Err(CircuitBreakerError::Open {
                service: self.service.clone(),
            });
        };

        let mut guard = ProbeGuard::new(self, admission);
        let result = operation().await;

        match &result {
            Ok(_) => self.record_success(admission),
            Err(error) => self.record_failure(admission, error.category()),
        }
        guard.disarm();

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Get a read-only health snapshot
    pub fn health(&self) -> CircuitHealth {
        let (consecutive_failures, recovery_elapsed) = {
            let inner = self.inner.lock();
            (inner.consecutive_failures, self.recovery_elapsed(&inner))
        };

        let state = match self.state() {
            CircuitState::Open if recovery_elapsed => CircuitState::HalfOpen,
            state => state,
        };
        let metrics = self.metrics();

        CircuitHealth {
            service: self.service.clone(),
            state,
            is_healthy: state != CircuitState::Open,
            failure_rate: metrics.failure_rate(),
            consecutive_failures,
            error_breakdown: metrics.error_breakdown(),
            metrics,
        }
    }

    /// Whether the next call could be admitted
    pub fn is_healthy(&self) -> bool {
        self.health().is_healthy
    }

    /// Whether a call arriving now could be admitted.
    ///
    /// Does not claim the probe slot; `call` still decides admission.
    pub fn is_call_permitted(&self) -> bool {
        if !self.config.enabled || self.state.load(Ordering::Acquire) == CircuitState::CLOSED {
            return true;
        }

        let inner = self.inner.lock();
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => false,
            CircuitState::Open => self.recovery_elapsed(&inner),
        }
    }

    /// Get the monotonic counters
    pub fn metrics(&self) -> CircuitMetricsSnapshot {
        let m = &self.metrics;
        CircuitMetricsSnapshot {
            total_calls: m.total_calls.load(Ordering::Relaxed),
            failed_calls: m.failed_calls.load(Ordering::Relaxed),
            circuit_opened_count: m.circuit_opened_count.load(Ordering::Relaxed),
            quota_exceeded_count: m.quota_exceeded_count.load(Ordering::Relaxed),
            timeout_count: m.timeout_count.load(Ordering::Relaxed),
            connection_error_count: m.connection_error_count.load(Ordering::Relaxed),
        }
    }

    /// Manually reset the circuit breaker to closed state.
    ///
    /// Historical counters are kept.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        self.state.store(CircuitState::CLOSED, Ordering::Release);
        inner.consecutive_failures = 0;
        inner.opened_at = None;

        tracing::info!(circuit = %self.service, "circuit breaker reset");
    }

    /// Manually open the circuit breaker
    pub fn trip(&self) {
        let mut inner = self.inner.lock();
        let previous = self.state.swap(CircuitState::OPEN, Ordering::AcqRel);
        inner.opened_at = Some(Instant::now());
        if previous == CircuitState::CLOSED {
            self.metrics
                .circuit_opened_count
                .fetch_add(1, Ordering::Relaxed);
        }

        tracing::warn!(circuit = %self.service, "circuit breaker tripped manually");
    }

    fn recovery_elapsed(&self, inner: &BreakerInner) -> bool {
        inner
            .opened_at
            .is_none_or(|opened_at| opened_at.elapsed() >= self.config.recovery_timeout)
    }

    fn try_admit(&self) -> Option<Admission> {
        if self.state.load(Ordering::Acquire) == CircuitState::CLOSED {
            return Some(Admission::Normal);
        }

        let inner = self.inner.lock();
        match self.state() {
            CircuitState::Closed => Some(Admission::Normal),
            CircuitState::HalfOpen => None,
            CircuitState::Open => {
                if !self.recovery_elapsed(&inner) {
                    return None;
                }
                // Only one caller can win the swap; the rest see HalfOpen.
                self.state
                    .compare_exchange(
                        CircuitState::OPEN,
                        CircuitState::HALF_OPEN,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .ok()
                    .map(|_| {
                        tracing::info!(
                            circuit = %self.service,
                            "circuit breaker half-open, admitting probe"
                        );
                        Admission::Probe
                    })
            }
        }
    }

    fn record_success(&self, admission: Admission) {
        let mut inner = self.inner.lock();
        self.metrics.total_calls.fetch_add(1, Ordering::Relaxed);

        match admission {
            Admission::Normal => {
                if self.state() == CircuitState::Closed {
                    inner.consecutive_failures = 0;
                }
            }
            Admission::Probe => {
                inner.consecutive_failures = 0;
                if self.transition(CircuitState::HALF_OPEN, CircuitState::CLOSED) {
                    inner.opened_at = None;
                    tracing::info!(circuit = %self.service, "circuit breaker closed");
                }
            }
        }
    }

    fn record_failure(&self, admission: Admission, category: ErrorCategory) {
        let mut inner = self.inner.lock();
        self.metrics.total_calls.fetch_add(1, Ordering::Relaxed);
        self.metrics.failed_calls.fetch_add(1, Ordering::Relaxed);
        self.count_category(category);
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        match admission {
            Admission::Probe => {
                if self.transition(CircuitState::HALF_OPEN, CircuitState::OPEN) {
                    inner.opened_at = Some(Instant::now());
                    tracing::warn!(
                        circuit = %self.service,
                        category = category.as_str(),
                        "probe failed, circuit breaker reopened"
                    );
                }
            }
            Admission::Normal => {
                if inner.consecutive_failures >= self.config.failure_threshold
                    && self.transition(CircuitState::CLOSED, CircuitState::OPEN)
                {
                    inner.opened_at = Some(Instant::now());
                    self.metrics
                        .circuit_opened_count
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        circuit = %self.service,
                        category = category.as_str(),
                        "Circuit breaker opened after {} failures",
                        inner.consecutive_failures
                    );
                }
            }
        }
    }

    /// A probe future was dropped before it resolved
    fn abandon_probe(&self) {
        let mut inner = self.inner.lock();
        if self.transition(CircuitState::HALF_OPEN, CircuitState::OPEN) {
            inner.opened_at = Some(Instant::now());
            tracing::warn!(circuit = %self.service, "probe abandoned, circuit breaker reopened");
        }
    }

    fn count_category(&self, category: ErrorCategory) {
        let counter = match category {
            ErrorCategory::Quota => &self.metrics.quota_exceeded_count,
            ErrorCategory::Timeout => &self.metrics.timeout_count,
            ErrorCategory::Connection => &self.metrics.connection_error_count,
            ErrorCategory::Other => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn transition(&self, from: u8, to: u8) -> bool {
        self.state
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Reopens the circuit if a probe is cancelled mid-flight, so the breaker
/// cannot stay half-open with nobody holding the probe slot.
struct ProbeGuard<'a> {
    breaker: Option<&'a CircuitBreaker>,
}

impl<'a> ProbeGuard<'a> {
    fn new(breaker: &'a CircuitBreaker, admission: Admission) -> Self {
        Self {
            breaker: (admission == Admission::Probe).then_some(breaker),
        }
    }

    fn disarm(&mut self) {
        self.breaker = None;
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if let Some(breaker) = self.breaker.take() {
            breaker.abandon_probe();
        }
    }
}
