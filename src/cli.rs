//! Command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Periodic report-export daemon.
#[derive(Parser)]
#[command(name = "reportd", version, about)]
pub struct Cli {
    /// Path to the configuration file (defaults to reportd.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// What to do
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the export workflow until a fatal error or shutdown signal
    Run(RunArgs),
    /// Print the effective merged configuration as YAML
    Config,
}

/// Arguments for the `run` command.
#[derive(Args)]
pub struct RunArgs {
    /// Execute a single cycle and exit
    #[arg(long)]
    pub once: bool,
}
