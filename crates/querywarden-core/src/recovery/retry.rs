//! Retry policy for transient warehouse failures
//!
//! Retries only the transient categories (quota, timeout, connection) with
//! capped exponential backoff. The backoff sleep is the only place this
//! layer suspends on its own, and it can be cancelled.

use super::backoff::{BackoffConfig, BackoffStrategy, ExponentialBackoff};
use super::{Classify, ErrorCategory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Configuration for retry behavior
///
/// # Example
/// ```
/// use querywarden_core::recovery::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_max_retries(5)
///     .with_base_delay(Duration::from_millis(200))
///     .with_max_delay(Duration::from_secs(10));
/// assert_eq!(config.max_retries, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Maximum delay between retries
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add random jitter to prevent thundering herd
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Convert to BackoffConfig for use with backoff strategies
    pub fn to_backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            multiplier: self.backoff_multiplier,
            jitter: self.jitter,
        }
    }

    /// Create an ExponentialBackoff from this config
    pub fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::with_config(self.to_backoff_config())
    }
}

/// Terminal failure of a retried operation
#[derive(Debug)]
pub enum RetryError<E> {
    /// A transient failure persisted through the whole retry budget
    Exhausted { attempts: u32, last_error: E },
    /// A non-transient failure; returned without retrying
    Permanent { attempts: u32, error: E },
    /// The cancellation token fired before the operation finished
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    /// Number of attempts actually made
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Permanent { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    /// The last underlying error, if the operation ran at all
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { last_error, .. } => Some(last_error),
            Self::Permanent { error, .. } => Some(error),
            Self::Cancelled { .. } => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted {
                attempts,
                last_error,
            } => write!(f, "Retries exhausted after {} attempts: {}", attempts, last_error),
            Self::Permanent { attempts, error } => {
                write!(f, "Non-retryable failure on attempt {}: {}", attempts, error)
            }
            Self::Cancelled { attempts } => {
                write!(f, "Cancelled after {} attempts", attempts)
            }
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.last_error().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl<E: Classify> Classify for RetryError<E> {
    fn category(&self) -> ErrorCategory {
        self.last_error()
            .map(|e| e.category())
            .unwrap_or(ErrorCategory::Other)
    }
}

/// Snapshot of retry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetryStats {
    /// Every retry attempt taken (the first attempt is not counted)
    pub total_retries: u64,
    /// Operations that succeeded after at least one retry
    pub successful_retries: u64,
    /// Operations that ended with a transient failure and no budget left
    pub failed_retries: u64,
}

/// Retry policy shared by all callers of one service
pub struct RetryPolicy {
    config: RetryConfig,
    backoff: Box<dyn BackoffStrategy>,
    total_retries: AtomicU64,
    successful_retries: AtomicU64,
    failed_retries: AtomicU64,
}

impl RetryPolicy {
    /// Create a new retry policy with default config and exponential backoff
    pub fn new() -> Self {
        Self::with_config(RetryConfig::default())
    }

    /// Create a new retry policy using the backoff settings from the config
    pub fn with_config(config: RetryConfig) -> Self {
        let backoff = config.create_backoff();
        Self {
            config,
            backoff: Box::new(backoff),
            total_retries: AtomicU64::new(0),
            successful_retries: AtomicU64::new(0),
            failed_retries: AtomicU64::new(0),
        }
    }

    /// Set custom backoff strategy
    pub fn with_backoff<B: BackoffStrategy + 'static>(mut self, backoff: B) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Decide whether a failure should be retried.
    ///
    /// `attempt` is the number of retries already taken for this operation.
    /// Once it reaches `max_retries` nothing is retried; before that only
    /// transient categories are.
    pub fn should_retry<E: Classify + ?Sized>(&self, error: &E, attempt: u32) -> bool {
        if attempt >= self.config.max_retries {
            return false;
        }
        error.category().is_transient()
    }

    /// Delay before the given retry (1-indexed)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.delay_for_attempt(attempt)
    }

    /// Execute an operation, retrying transient failures.
    ///
    /// Makes at most `max_retries + 1` attempts. The backoff sleep races the
    /// cancellation token when one is given.
    pub async fn execute<T, E, F, Fut>(
        &self,
        mut operation: F,
        cancel_token: Option<&CancellationToken>,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        let mut attempt: u32 = 1;

        loop {
            if cancel_token.is_some_and(|token| token.is_cancelled()) {
                return Err(RetryError::Cancelled {
                    attempts: attempt - 1,
                });
            }

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        self.successful_retries.fetch_add(1, Ordering::Relaxed);
                        tracing::info!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let retries_taken = attempt - 1;
            let category = error.category();

            if !self.should_retry(&error, retries_taken) {
                if category.is_transient() {
                    self.failed_retries.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        attempts = attempt,
                        category = category.as_str(),
                        "all retry attempts exhausted"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last_error: error,
                    });
                }

                tracing::warn!(
                    attempt,
                    category = category.as_str(),
                    "non-retryable error"
                );
                return Err(RetryError::Permanent {
                    attempts: attempt,
                    error,
                });
            }

            let delay = self.delay_for(attempt);
            tracing::warn!(
                attempt,
                max_attempts = self.config.max_retries + 1,
                delay_ms = delay.as_millis() as u64,
                category = category.as_str(),
                error = %error,
                "retrying after transient failure"
            );

            if let Some(token) = cancel_token {
                tokio::select! {
                    _ = token.cancelled() => {
                        return Err(RetryError::Cancelled { attempts: attempt });
                    }
                    _ = sleep(delay) => {}
                }
            } else {
                sleep(delay).await;
            }

            self.total_retries.fetch_add(1, Ordering::Relaxed);
            attempt += 1;
        }
    }

    /// Get retry counters
    pub fn stats(&self) -> RetryStats {
        RetryStats {
            total_retries: self.total_retries.load(Ordering::Relaxed),
            successful_retries: self.successful_retries.load(Ordering::Relaxed),
            failed_retries: self.failed_retries.load(Ordering::Relaxed),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
