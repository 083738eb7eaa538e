//! Configuration model
//!
//! Durations are stored as plain seconds so files stay readable; the
//! conversion helpers at the bottom turn each section into the runtime type
//! the execution layer consumes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cost::{BYTES_PER_TIB, CostModel, CustomerTier, TierLimits, TierTable};
use crate::executor::{DEFAULT_QUERY_TIMEOUT_SECS, Environment, ExecutorSettings, TimeoutPolicy};
use crate::recovery::RetryConfig;
use crate::recovery::circuit_breaker::CircuitBreakerConfig;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryWardenConfig {
    pub environment: Environment,
    pub service: ServiceConfig,
    pub circuit_breaker: CircuitBreakerSection,
    pub retry: RetrySection,
    pub tiers: TiersSection,
    pub cost: CostSection,
    pub timeouts: TimeoutsSection,
    pub fallback: FallbackSection,
    pub logging: LoggingSection,
}

/// The protected warehouse service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Breaker and log name of the service
    pub name: String,
    /// Dataset export tables are written into
    pub dataset: String,
    /// Tier applied when a caller names none
    pub default_tier: CustomerTier,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "warehouse".to_string(),
            dataset: "analytics".to_string(),
            default_tier: CustomerTier::Standard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSection {
    pub enabled: bool,
    pub failure_threshold: u32,
    pub recovery_timeout_seconds: u64,
}

impl Default for CircuitBreakerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            recovery_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_retries: u32,
    pub base_delay_seconds: f64,
    pub max_delay_seconds: f64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_seconds: 1.0,
            max_delay_seconds: 60.0,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Limits for one customer tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierSection {
    pub query_timeout_seconds: u64,
    pub cost_cap_usd: f64,
}

impl TierSection {
    pub fn new(query_timeout_seconds: u64, cost_cap_usd: f64) -> Self {
        Self {
            query_timeout_seconds,
            cost_cap_usd,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiersSection {
    pub standard: TierSection,
    pub premium: TierSection,
    pub enterprise: TierSection,
}

impl Default for TiersSection {
    fn default() -> Self {
        Self {
            standard: TierSection::new(30, 10.0),
            premium: TierSection::new(120, 50.0),
            enterprise: TierSection::new(300, 200.0),
        }
    }
}

impl TiersSection {
    pub fn get(&self, tier: CustomerTier) -> &TierSection {
        match tier {
            CustomerTier::Standard => &self.standard,
            CustomerTier::Premium => &self.premium,
            CustomerTier::Enterprise => &self.enterprise,
        }
    }

    pub fn get_mut(&mut self, tier: CustomerTier) -> &mut TierSection {
        match tier {
            CustomerTier::Standard => &mut self.standard,
            CustomerTier::Premium => &mut self.premium,
            CustomerTier::Enterprise => &mut self.enterprise,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostSection {
    pub cost_per_tb: f64,
    pub bytes_per_tb: u64,
}

impl Default for CostSection {
    fn default() -> Self {
        Self {
            cost_per_tb: 5.0,
            bytes_per_tb: BYTES_PER_TIB,
        }
    }
}

/// Timeout scaling per non-production environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentMultipliers {
    pub development: f64,
    pub test: f64,
    pub staging: f64,
}

impl Default for EnvironmentMultipliers {
    fn default() -> Self {
        Self {
            development: 0.5,
            test: 0.5,
            staging: 1.0,
        }
    }
}

impl EnvironmentMultipliers {
    /// Multiplier for an environment; production is always 1.0
    pub fn for_environment(&self, environment: Environment) -> f64 {
        match environment {
            Environment::Development => self.development,
            Environment::Test => self.test,
            Environment::Staging => self.staging,
            Environment::Production => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsSection {
    /// Used when neither a tier nor a raw timeout is supplied
    pub default_query_timeout_seconds: u64,
    pub multipliers: EnvironmentMultipliers,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            default_query_timeout_seconds: DEFAULT_QUERY_TIMEOUT_SECS,
            multipliers: EnvironmentMultipliers::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSection {
    /// Root directory of the JSONL fallback sink; `~` and `$VAR` are expanded
    pub directory: String,
}

impl Default for FallbackSection {
    fn default() -> Self {
        Self {
            directory: "~/.querywarden/fallback".to_string(),
        }
    }
}

impl FallbackSection {
    /// Directory with `~` and environment variables expanded
    pub fn resolved_directory(&self) -> PathBuf {
        match shellexpand::full(&self.directory) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => {
                // Unset variables stay literal; only `~` is expanded
                let fallback = shellexpand::tilde_with_context(&self.directory, || {
                    dirs::home_dir().and_then(|home| home.to_str().map(str::to_owned))
                });
                PathBuf::from(fallback.as_ref())
            }
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Level or `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl QueryWardenConfig {
    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            enabled: self.circuit_breaker.enabled,
            failure_threshold: self.circuit_breaker.failure_threshold,
            recovery_timeout: Duration::from_secs(self.circuit_breaker.recovery_timeout_seconds),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(self.retry.max_retries)
            .with_base_delay(seconds(self.retry.base_delay_seconds))
            .with_max_delay(seconds(self.retry.max_delay_seconds))
            .with_backoff_multiplier(self.retry.backoff_multiplier)
            .with_jitter(self.retry.jitter)
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(self.cost.cost_per_tb).with_bytes_per_tb(self.cost.bytes_per_tb)
    }

    pub fn tier_table(&self) -> TierTable {
        let mut table = TierTable::default();
        for tier in CustomerTier::ALL {
            let section = self.tiers.get(tier);
            table.set(
                tier,
                TierLimits::new(
                    Duration::from_secs(section.query_timeout_seconds),
                    section.cost_cap_usd,
                ),
            );
        }
        table
    }

    pub fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(
            self.environment,
            self.timeouts.multipliers.for_environment(self.environment),
            Duration::from_secs(self.timeouts.default_query_timeout_seconds),
        )
    }

    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            cost: self.cost_model(),
            tiers: self.tier_table(),
            default_tier: self.service.default_tier,
            timeouts: self.timeout_policy(),
        }
    }
}

/// Invalid values become zero; `validate` rejects them before they get here
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
