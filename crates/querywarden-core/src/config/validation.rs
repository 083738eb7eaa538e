//! Configuration validation

use super::model::QueryWardenConfig;
use crate::cost::CustomerTier;
use crate::error::{QueryError, QueryResult};

/// Check every section, reporting the first problem found
pub fn validate(config: &QueryWardenConfig) -> QueryResult<()> {
    validate_service(config)?;
    validate_circuit_breaker(config)?;
    validate_retry(config)?;
    validate_cost(config)?;
    validate_tiers(config)?;
    validate_timeouts(config)?;
    Ok(())
}

fn validate_service(config: &QueryWardenConfig) -> QueryResult<()> {
    if config.service.name.trim().is_empty() {
        return Err(QueryError::config("Service name must not be empty"));
    }
    if config.service.dataset.trim().is_empty() || config.service.dataset.contains('`') {
        return Err(QueryError::config_with_context(
            "Dataset must be a non-empty identifier",
            format!("service.dataset = {:?}", config.service.dataset),
        ));
    }
    Ok(())
}

fn validate_circuit_breaker(config: &QueryWardenConfig) -> QueryResult<()> {
    let cb = &config.circuit_breaker;
    if cb.failure_threshold == 0 {
        return Err(QueryError::config(
            "Circuit breaker failure threshold must be greater than 0",
        ));
    }
    if cb.recovery_timeout_seconds == 0 {
        return Err(QueryError::config(
            "Circuit breaker recovery timeout must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_retry(config: &QueryWardenConfig) -> QueryResult<()> {
    let retry = &config.retry;
    if !retry.base_delay_seconds.is_finite() || retry.base_delay_seconds <= 0.0 {
        return Err(QueryError::config(format!(
            "Retry base delay must be positive, got {}",
            retry.base_delay_seconds
        )));
    }
    if !retry.max_delay_seconds.is_finite() || retry.base_delay_seconds > retry.max_delay_seconds {
        return Err(QueryError::config(format!(
            "Retry base delay ({}s) must not exceed max delay ({}s)",
            retry.base_delay_seconds, retry.max_delay_seconds
        )));
    }
    if retry.backoff_multiplier.is_nan() || retry.backoff_multiplier < 1.0 {
        return Err(QueryError::config(format!(
            "Retry backoff multiplier must be at least 1.0, got {}",
            retry.backoff_multiplier
        )));
    }
    Ok(())
}

fn validate_cost(config: &QueryWardenConfig) -> QueryResult<()> {
    if config.cost.cost_per_tb.is_nan() || config.cost.cost_per_tb < 0.0 {
        return Err(QueryError::config("Cost per TB must not be negative"));
    }
    if config.cost.bytes_per_tb == 0 {
        return Err(QueryError::config("Bytes per TB must be greater than 0"));
    }
    Ok(())
}

fn validate_tiers(config: &QueryWardenConfig) -> QueryResult<()> {
    for tier in CustomerTier::ALL {
        let section = config.tiers.get(tier);
        if section.cost_cap_usd.is_nan() || section.cost_cap_usd < 0.0 {
            return Err(QueryError::config(format!(
                "Cost cap for the {} tier must not be negative",
                tier
            )));
        }
        if section.query_timeout_seconds == 0 {
            return Err(QueryError::config(format!(
                "Query timeout for the {} tier must be greater than 0",
                tier
            )));
        }
    }
    Ok(())
}

fn validate_timeouts(config: &QueryWardenConfig) -> QueryResult<()> {
    if config.timeouts.default_query_timeout_seconds == 0 {
        return Err(QueryError::config(
            "Default query timeout must be greater than 0",
        ));
    }

    let multipliers = &config.timeouts.multipliers;
    for (name, value) in [
        ("development", multipliers.development),
        ("test", multipliers.test),
        ("staging", multipliers.staging),
    ] {
        if value.is_nan() || value <= 0.0 || value > 1.0 {
            return Err(QueryError::config(format!(
                "Timeout multiplier for {} must be in (0, 1], got {}",
                name, value
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rejected(config: QueryWardenConfig, needle: &str) {
        let err = validate(&config).unwrap_err();
        assert_eq!(err.error_code(), "QW_CONFIG");
        assert!(err.to_string().contains(needle), "{err}");
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&QueryWardenConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = QueryWardenConfig::default();
        config.circuit_breaker.failure_threshold = 0;
        assert_rejected(config, "failure threshold");
    }

    #[test]
    fn test_base_delay_above_max_rejected() {
        let mut config = QueryWardenConfig::default();
        config.retry.base_delay_seconds = 90.0;
        assert_rejected(config, "must not exceed max delay");
    }

    #[test]
    fn test_shrinking_multiplier_rejected() {
        let mut config = QueryWardenConfig::default();
        config.retry.backoff_multiplier = 0.5;
        assert_rejected(config, "multiplier");
    }

    #[test]
    fn test_negative_cost_cap_rejected() {
        let mut config = QueryWardenConfig::default();
        config.tiers.premium.cost_cap_usd = -1.0;
        assert_rejected(config, "premium tier");
    }

    #[test]
    fn test_zero_bytes_per_tb_rejected() {
        let mut config = QueryWardenConfig::default();
        config.cost.bytes_per_tb = 0;
        assert_rejected(config, "Bytes per TB");
    }

    #[test]
    fn test_timeout_multiplier_range() {
        let mut config = QueryWardenConfig::default();
        config.timeouts.multipliers.development = 1.5;
        assert_rejected(config, "development");

        let mut config = QueryWardenConfig::default();
        config.timeouts.multipliers.test = 0.0;
        assert_rejected(config, "test");
    }
}
