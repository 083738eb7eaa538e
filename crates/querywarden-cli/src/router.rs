//! Command routing logic for CLI

use crate::args::{Cli, Commands, ConfigAction};
use crate::commands;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => commands::config::show(config_path, format),
            ConfigAction::Validate => commands::config::validate(config_path, cli.verbose),
        },
        Commands::Estimate { bytes, tier } => commands::estimate::run(config_path, bytes, tier),
        Commands::Simulate(args) => commands::simulate::run(config_path, &args).await,
    }
}
