//! Configuration commands

use crate::args::OutputFormat;
use crate::console::CliConsole;
use anyhow::Context;
use querywarden_core::config::{QueryWardenConfig, discover_config_file, load_config};
use querywarden_core::cost::CustomerTier;
use std::path::Path;

/// Print the effective configuration
pub fn show(config_path: Option<&Path>, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let rendered = match format {
        OutputFormat::Toml => config.to_toml_string()?,
        OutputFormat::Json => {
            serde_json::to_string_pretty(&config).context("Failed to render configuration")?
        }
    };
    println!("{rendered}");
    Ok(())
}

/// Load and validate configuration, printing a summary
pub fn validate(config_path: Option<&Path>, verbose: bool) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration Validation");

    match config_path.map(Path::to_path_buf).or_else(discover_config_file) {
        Some(path) => console.info(&format!("Validating configuration file: {}", path.display())),
        None => console.info("No configuration file found, validating defaults and environment"),
    }

    match load_config(config_path) {
        Ok(config) => {
            console.success("Configuration is valid");
            print_summary(&console, &config, verbose);
            Ok(())
        }
        Err(e) => {
            console.error(&format!("Configuration validation failed: {e}"));
            if let Some(detail) = e.detail() {
                console.error(detail);
            }
            Err(e.into())
        }
    }
}

fn print_summary(console: &CliConsole, config: &QueryWardenConfig, verbose: bool) {
    console.field("service", &config.service.name);
    console.field("environment", config.environment);
    console.field(
        "circuit breaker",
        format!(
            "threshold {} / recovery {}s{}",
            config.circuit_breaker.failure_threshold,
            config.circuit_breaker.recovery_timeout_seconds,
            if config.circuit_breaker.enabled {
                ""
            } else {
                " (disabled)"
            }
        ),
    );
    console.field(
        "retry",
        format!(
            "{} retries, {}s..{}s x{}",
            config.retry.max_retries,
            config.retry.base_delay_seconds,
            config.retry.max_delay_seconds,
            config.retry.backoff_multiplier
        ),
    );
    console.field("cost per TB", format!("${:.2}", config.cost.cost_per_tb));

    if verbose {
        for tier in CustomerTier::ALL {
            let limits = config.tiers.get(tier);
            console.field(
                &format!("tier {tier}"),
                format!(
                    "cap ${:.2}, timeout {}s",
                    limits.cost_cap_usd, limits.query_timeout_seconds
                ),
            );
        }
        console.field(
            "fallback directory",
            config.fallback.resolved_directory().display(),
        );
    }
}
