//! CLI interface for swarm-trader
//!
//! Provides subcommands for:
//! - `run`: Start the trading loop
//! - `check`: One-shot risk evaluation of the persisted state
//! - `status`: Show current state
//! - `config`: Show configuration

mod check;
mod run;

pub use check::CheckArgs;
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "swarm-trader")]
#[command(about = "Multi-agent trading orchestrator with AI-assisted risk controls")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the trading loop
    Run(RunArgs),
    /// One-shot risk evaluation of the persisted state
    Check(CheckArgs),
    /// Show current state
    Status,
    /// Show configuration
    Config,
}
