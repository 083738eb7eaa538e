//! Circuit breaker registry keyed by service name
//!
//! Built once at startup and shared by reference; breakers are created on
//! first lookup and live for the rest of the process.

use std::sync::Arc;

use super::breaker::CircuitBreaker;
use super::types::{CircuitBreakerConfig, CircuitHealth};

/// Collection of circuit breakers for multiple services
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    breakers: dashmap::DashMap<String, Arc<CircuitBreaker>>,
    default_config: CircuitBreakerConfig,
}

impl CircuitBreakerRegistry {
    /// Create a new registry with default config
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    /// Create a registry with custom default config
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: dashmap::DashMap::new(),
            default_config: config,
        }
    }

    /// Get or create a circuit breaker for a service
    pub fn get(&self, service: &str) -> Arc<CircuitBreaker> {
        self.get_with_config(service, self.default_config.clone())
    }

    /// Get or create with custom config.
    ///
    /// The config only applies when the breaker does not exist yet.
    pub fn get_with_config(&self, service: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| {
                tracing::debug!(circuit = %service, "registering circuit breaker");
                Arc::new(CircuitBreaker::with_config(service, config))
            })
            .clone()
    }

    /// Get all registered service names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Health snapshots for every breaker, sorted by service name
    pub fn all_health(&self) -> Vec<CircuitHealth> {
        let mut health: Vec<CircuitHealth> =
            self.breakers.iter().map(|e| e.value().health()).collect();
        health.sort_by(|a, b| a.service.cmp(&b.service));
        health
    }

    /// Reset all circuit breakers
    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
