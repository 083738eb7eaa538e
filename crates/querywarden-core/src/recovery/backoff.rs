//! Backoff strategies for retry operations
//!
//! Attempt numbers are 1-indexed: `delay_for_attempt(1)` is the pause before
//! the first retry.

use rand::Rng;
use std::time::Duration;

/// Configuration for exponential backoff
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive attempts
    pub multiplier: f64,
    /// Sample the final delay uniformly from `[delay / 2, delay]`
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Backoff strategy trait
pub trait BackoffStrategy: Send + Sync {
    /// Get the delay before the given retry (1-indexed)
    fn delay_for_attempt(&self, attempt: u32) -> Duration;
}

/// Capped exponential backoff with optional half-range jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    pub fn with_config(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Deterministic part of the delay: `min(max, base * multiplier^(n-1))`
    pub fn capped_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let raw = self.config.base_delay.as_secs_f64()
            * self.config.multiplier.powi(exponent.min(i32::MAX as u32) as i32);
        let max = self.config.max_delay.as_secs_f64();

        // powi overflows to +inf for large exponents; min() keeps it finite
        let secs = if raw.is_finite() { raw.min(max) } else { max };
        Duration::from_secs_f64(secs.max(0.0))
    }

    fn add_jitter(&self, delay: Duration) -> Duration {
        if !self.config.jitter || delay.is_zero() {
            return delay;
        }

        let upper = delay.as_secs_f64();
        let lower = upper / 2.0;
        let sampled = rand::thread_rng().gen_range(lower..=upper);
        Duration::from_secs_f64(sampled)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.add_jitter(self.capped_delay(attempt))
    }
}

/// Constant backoff - same delay for all attempts
#[derive(Debug, Clone)]
pub struct ConstantBackoff {
    delay: Duration,
}

impl ConstantBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl BackoffStrategy for ConstantBackoff {
    fn delay_for_attempt(&self, _attempt: u32) -> Duration {
        self.delay
    }
}
