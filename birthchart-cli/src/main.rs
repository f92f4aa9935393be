//! Binary crate for the `birthchart` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive prompts standing in for the birth data form
//! - Human-friendly output formatting

use clap::Parser;
use env_logger::Env;

mod cli;
mod prompt;
mod render;
mod workflow;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
