//! Binary crate for the weather agent.
//!
//! This crate focuses on:
//! - The HTTP API (`serve`)
//! - One-shot questions from the terminal (`ask`)
//! - Interactive configuration (`configure`)

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod error;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
