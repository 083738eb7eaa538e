//! QueryWarden CLI application
//!
//! Inspect configuration, price queries against the tier caps, and drive the
//! resilient exporter against a scripted in-process warehouse.
//!
//! ```bash
//! querywarden config show
//! querywarden estimate --bytes 3298534883328 --tier premium
//! querywarden simulate --script timeout,timeout,ok --records 10
//! ```

mod args;
mod commands;
mod console;
mod logging;
mod router;
mod simulated;

use args::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.config.as_deref(), cli.verbose);

    router::route(cli).await
}
