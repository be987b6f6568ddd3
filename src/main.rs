//! myprofiler - top for MySQL queries
//!
//! Samples SHOW FULL PROCESSLIST on a fixed cadence and prints the most
//! frequent normalized statements.

use anyhow::Result;
use clap::Parser;
use myprofiler::cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Logs go to stderr so stdout only carries reports
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run(cli)
}
