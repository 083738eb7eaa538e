//! Tracing subscriber setup

use querywarden_core::config::{LogFormat, LoggingSection, load_config};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level; `--verbose` raises the
/// configured level to `debug`. A configuration that fails to load falls back
/// to the default logging section so the command can still report the error.
pub fn init(config_path: Option<&Path>, verbose: bool) {
    let section = load_config(config_path)
        .map(|config| config.logging)
        .unwrap_or_default();
    install(&section, verbose);
}

fn install(section: &LoggingSection, verbose: bool) {
    let level = if verbose { "debug" } else { section.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match section.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    if let Err(e) = result {
        eprintln!("failed to install tracing subscriber: {e}");
    }
}
