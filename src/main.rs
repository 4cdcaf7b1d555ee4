mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout stays clean for DOT/JSON output.
    // Only warnings show by default; RUST_LOG=debug traces each load/analysis.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    match cli.command {
        Command::Graph { load, prune } => {
            commands::cmd_graph(&load.dir, &(&load).into(), prune, cli.json)
        }
        Command::Stats { load } => commands::cmd_stats(&load.dir, &(&load).into(), cli.json),
    }
}
