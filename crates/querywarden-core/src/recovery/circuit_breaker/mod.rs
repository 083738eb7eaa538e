//! Circuit breaker pattern for the protected warehouse service
//!
//! # State Transitions
//! ```text
//! Closed    → Open:     consecutive failures >= failure_threshold
//! Open      → HalfOpen: recovery timeout elapsed; exactly one caller becomes the probe
//! HalfOpen  → Closed:   probe succeeds
//! HalfOpen  → Open:     probe fails (fresh recovery timeout)
//! ```
//!
//! Every caller that is not admitted fails fast with
//! [`CircuitBreakerError::Open`]; nothing waits on the breaker.

mod breaker;
mod registry;
mod types;

pub use breaker::CircuitBreaker;
pub use registry::CircuitBreakerRegistry;
pub use types::{
    CircuitBreakerConfig, CircuitBreakerError, CircuitHealth, CircuitMetricsSnapshot,
    CircuitState, ErrorBreakdown,
};
