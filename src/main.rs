//! Shannon Insight CLI
//!
//! Thin front end over the `shannon_insight` engine: loads scanner facts,
//! runs the insight kernel and manages the snapshot history. All results
//! are JSON on stdout; logs go to stderr.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run(cli)
}
