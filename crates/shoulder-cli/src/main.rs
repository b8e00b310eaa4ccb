//! Shoulder CLI - train, retrain and score the event recommender.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shoulder_cli::Cli;

fn main() -> Result<()> {
    // stdout carries the JSON output, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("shoulder=info".parse()?))
        .init();

    let cli = Cli::parse();
    info!("Shoulder CLI starting...");

    cli.command.run()?;

    info!("Shoulder CLI completed successfully");
    Ok(())
}
