//! Query timeout resolution
//!
//! A tier's timeout always beats a caller-supplied raw timeout. Outside
//! production the resolved value is scaled down so tests and development
//! runs fail fast.

use crate::cost::TierLimits;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default query timeout when neither a tier nor a raw timeout is given
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" | "testing" => Ok(Self::Test),
            "staging" | "stage" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

/// Resolves the deadline for one execution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeoutPolicy {
    environment: Environment,
    multiplier: f64,
    default_timeout: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            multiplier: 1.0,
            default_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        }
    }
}

impl TimeoutPolicy {
    /// `multiplier` is ignored in production.
    pub fn new(environment: Environment, multiplier: f64, default_timeout: Duration) -> Self {
        let multiplier = if environment.is_production() {
            1.0
        } else {
            multiplier
        };
        Self {
            environment,
            multiplier,
            default_timeout,
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Pick the base timeout (tier, then explicit, then default) and scale it
    pub fn resolve(&self, tier: Option<&TierLimits>, explicit: Option<Duration>) -> Duration {
        let base = tier
            .map(|limits| limits.query_timeout)
            .or(explicit)
            .unwrap_or(self.default_timeout);
        self.scale(base)
    }

    fn scale(&self, timeout: Duration) -> Duration {
        if self.environment.is_production() || self.multiplier == 1.0 {
            return timeout;
        }
        timeout.mul_f64(self.multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(secs: u64) -> TierLimits {
        TierLimits::new(Duration::from_secs(secs), 10.0)
    }

    #[test]
    fn test_tier_timeout_wins_over_explicit() {
        let policy = TimeoutPolicy::default();
        let resolved = policy.resolve(Some(&limits(120)), Some(Duration::from_secs(5)));
        assert_eq!(resolved, Duration::from_secs(120));
    }

    #[test]
    fn test_explicit_timeout_without_tier() {
        let policy = TimeoutPolicy::default();
        assert_eq!(
            policy.resolve(None, Some(Duration::from_secs(45))),
            Duration::from_secs(45)
        );
        assert_eq!(
            policy.resolve(None, None),
            Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_development_scales_timeout() {
        let policy = TimeoutPolicy::new(Environment::Development, 0.5, Duration::from_secs(60));
        assert_eq!(
            policy.resolve(Some(&limits(30)), None),
            Duration::from_secs(15)
        );
        assert_eq!(policy.resolve(None, None), Duration::from_secs(30));
    }

    #[test]
    fn test_production_never_scales() {
        let policy = TimeoutPolicy::new(Environment::Production, 0.25, Duration::from_secs(60));
        assert_eq!(policy.multiplier(), 1.0);
        assert_eq!(
            policy.resolve(Some(&limits(30)), None),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("dev".parse::<Environment>(), Ok(Environment::Development));
        assert_eq!("PRODUCTION".parse::<Environment>(), Ok(Environment::Production));
        assert!("qa".parse::<Environment>().is_err());
    }
}
