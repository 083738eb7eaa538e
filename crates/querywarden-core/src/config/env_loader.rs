//! Environment variable overrides
//!
//! Every variable carries the `QUERYWARDEN_` prefix. Unset variables leave
//! the current value alone; unparsable ones are configuration errors.

use std::str::FromStr;

use super::model::{LogFormat, QueryWardenConfig};
use crate::cost::CustomerTier;
use crate::error::{QueryError, QueryResult};

pub const ENV_PREFIX: &str = "QUERYWARDEN_";

/// Apply overrides from the process environment
pub fn apply_env_overrides(config: &mut QueryWardenConfig) -> QueryResult<()> {
    apply_overrides_with(config, |key| std::env::var(key).ok())
}

/// Apply overrides using `lookup` to read variables
pub fn apply_overrides_with<F>(config: &mut QueryWardenConfig, lookup: F) -> QueryResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));

    if let Some(value) = get("SERVICE_NAME") {
        config.service.name = value;
    }
    if let Some(value) = get("DATASET") {
        config.service.dataset = value;
    }
    set_parsed(&get, "DEFAULT_TIER", &mut config.service.default_tier)?;
    set_parsed(&get, "ENVIRONMENT", &mut config.environment)?;

    set_parsed(&get, "CB_ENABLED", &mut config.circuit_breaker.enabled)?;
    set_parsed(
        &get,
        "CB_FAILURE_THRESHOLD",
        &mut config.circuit_breaker.failure_threshold,
    )?;
    set_parsed(
        &get,
        "CB_RECOVERY_TIMEOUT_SECONDS",
        &mut config.circuit_breaker.recovery_timeout_seconds,
    )?;

    set_parsed(&get, "RETRY_MAX_RETRIES", &mut config.retry.max_retries)?;
    set_parsed(
        &get,
        "RETRY_BASE_DELAY_SECONDS",
        &mut config.retry.base_delay_seconds,
    )?;
    set_parsed(
        &get,
        "RETRY_MAX_DELAY_SECONDS",
        &mut config.retry.max_delay_seconds,
    )?;
    set_parsed(
        &get,
        "RETRY_BACKOFF_MULTIPLIER",
        &mut config.retry.backoff_multiplier,
    )?;
    set_parsed(&get, "RETRY_JITTER", &mut config.retry.jitter)?;

    set_parsed(&get, "COST_PER_TB", &mut config.cost.cost_per_tb)?;
    set_parsed(&get, "BYTES_PER_TB", &mut config.cost.bytes_per_tb)?;

    for tier in CustomerTier::ALL {
        let upper = tier.as_str().to_uppercase();
        let section = config.tiers.get_mut(tier);
        set_parsed(
            &get,
            &format!("TIER_{}_QUERY_TIMEOUT_SECONDS", upper),
            &mut section.query_timeout_seconds,
        )?;
        set_parsed(
            &get,
            &format!("TIER_{}_COST_CAP_USD", upper),
            &mut section.cost_cap_usd,
        )?;
    }

    set_parsed(
        &get,
        "DEFAULT_QUERY_TIMEOUT_SECONDS",
        &mut config.timeouts.default_query_timeout_seconds,
    )?;

    if let Some(value) = get("FALLBACK_DIR") {
        config.fallback.directory = value;
    }
    if let Some(value) = get("LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Some(value) = get("LOG_FORMAT") {
        config.logging.format = parse_log_format(&value)?;
    }

    Ok(())
}

fn set_parsed<G, T>(get: &G, suffix: &str, target: &mut T) -> QueryResult<()>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = get(suffix) {
        *target = raw.trim().parse().map_err(|e: T::Err| {
            QueryError::config_with_context(
                format!("Invalid {}{} value: {:?}", ENV_PREFIX, suffix, raw),
                e.to_string(),
            )
        })?;
    }
    Ok(())
}

fn parse_log_format(raw: &str) -> QueryResult<LogFormat> {
    match raw.trim().to_lowercase().as_str() {
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        "compact" => Ok(LogFormat::Compact),
        other => Err(QueryError::config(format!(
            "Invalid {}LOG_FORMAT value: {:?}",
            ENV_PREFIX, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Environment;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = QueryWardenConfig::default();
        apply_overrides_with(
            &mut config,
            lookup(&[
                ("QUERYWARDEN_ENVIRONMENT", "development"),
                ("QUERYWARDEN_CB_FAILURE_THRESHOLD", "9"),
                ("QUERYWARDEN_RETRY_MAX_RETRIES", "1"),
                ("QUERYWARDEN_RETRY_JITTER", "false"),
                ("QUERYWARDEN_TIER_PREMIUM_COST_CAP_USD", "75.5"),
                ("QUERYWARDEN_LOG_FORMAT", "JSON"),
            ]),
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.circuit_breaker.failure_threshold, 9);
        assert_eq!(config.retry.max_retries, 1);
        assert!(!config.retry.jitter);
        assert_eq!(config.tiers.premium.cost_cap_usd, 75.5);
        assert_eq!(config.logging.format, LogFormat::Json);
        // Untouched values keep their defaults
        assert_eq!(config.tiers.standard.cost_cap_usd, 10.0);
    }

    #[test]
    fn test_unparsable_override_is_config_error() {
        let mut config = QueryWardenConfig::default();
        let err = apply_overrides_with(
            &mut config,
            lookup(&[("QUERYWARDEN_CB_FAILURE_THRESHOLD", "many")]),
        )
        .unwrap_err();

        assert_eq!(err.error_code(), "QW_CONFIG");
        assert!(err.to_string().contains("QUERYWARDEN_CB_FAILURE_THRESHOLD"));
    }

    #[test]
    fn test_unknown_tier_rejected() {
        let mut config = QueryWardenConfig::default();
        let result = apply_overrides_with(
            &mut config,
            lookup(&[("QUERYWARDEN_DEFAULT_TIER", "platinum")]),
        );
        assert!(result.is_err());
    }
}
