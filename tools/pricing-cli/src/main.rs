//! Pricing CLI
//!
//! Command line driver for the pricing engine: quotes, batch runs and
//! platform comparisons over a TOML product catalog.

mod catalog;
mod cli;
mod format;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use cli::{load_config, Cli, CliHandler};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize_logging(cli.log_format)?;

    let config = load_config(cli.config.as_deref())?;
    debug!("Configuration: {:?}", config);

    CliHandler::new(config).handle_command(cli.command)
}
