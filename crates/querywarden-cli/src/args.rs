//! CLI argument definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use querywarden_core::CustomerTier;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "querywarden")]
#[command(about = "QueryWarden - resilient, cost-gated execution for metered warehouses")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML, JSON or YAML configuration file
    #[arg(long, short, global = true, env = "QUERYWARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Price a dry-run byte count and check it against a tier's cost cap
    Estimate {
        /// Bytes the query would scan
        #[arg(long)]
        bytes: u64,

        /// Customer tier (defaults to the configured default tier)
        #[arg(long, value_parser = parse_tier)]
        tier: Option<CustomerTier>,
    },

    /// Export batches through a scripted in-process warehouse
    Simulate(SimulateArgs),
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective configuration after all sources are applied
    Show {
        #[arg(long, value_enum, default_value = "toml")]
        format: OutputFormat,
    },

    /// Load and validate the configuration
    Validate,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Toml,
    Json,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Customer the batches belong to
    #[arg(long, default_value = "demo-customer")]
    pub customer: String,

    /// Records per table in each batch
    #[arg(long, default_value_t = 10)]
    pub records: usize,

    /// Destination tables
    #[arg(long, value_delimiter = ',', default_value = "events")]
    pub tables: Vec<String>,

    /// Number of batches to export
    #[arg(long, default_value_t = 1)]
    pub batches: u32,

    /// Outcome of each execute call in order: ok, timeout, quota, connection
    /// or error. Calls past the end of the script succeed.
    #[arg(long, value_delimiter = ',')]
    pub script: Vec<String>,

    /// Fail every execute call with this outcome instead of following a script
    #[arg(long, conflicts_with = "script")]
    pub always: Option<String>,

    /// Bytes each dry run reports
    #[arg(long, default_value_t = 1 << 30)]
    pub bytes_per_query: u64,

    /// Customer tier for every batch
    #[arg(long, value_parser = parse_tier)]
    pub tier: Option<CustomerTier>,

    /// Override the fallback directory
    #[arg(long)]
    pub fallback_dir: Option<PathBuf>,

    /// Retry delay in milliseconds, replacing the configured backoff delays
    #[arg(long, default_value_t = 10)]
    pub retry_delay_ms: u64,
}

fn parse_tier(raw: &str) -> Result<CustomerTier, String> {
    raw.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_estimate() {
        let cli =
            Cli::try_parse_from(["querywarden", "estimate", "--bytes", "1024", "--tier", "premium"])
                .unwrap();
        match cli.command {
            Commands::Estimate { bytes, tier } => {
                assert_eq!(bytes, 1024);
                assert_eq!(tier, Some(CustomerTier::Premium));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_simulate_script() {
        let cli = Cli::try_parse_from([
            "querywarden",
            "simulate",
            "--script",
            "timeout,timeout,ok",
            "--tables",
            "orders,refunds",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.script, vec!["timeout", "timeout", "ok"]);
                assert_eq!(args.tables, vec!["orders", "refunds"]);
                assert_eq!(args.records, 10);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_bad_tier_rejected() {
        let result = Cli::try_parse_from(["querywarden", "estimate", "--bytes", "1", "--tier", "gold"]);
        assert!(result.is_err());
    }
}
