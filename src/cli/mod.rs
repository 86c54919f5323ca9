//! CLI interface for trend-agent
//!
//! Provides subcommands for:
//! - `run`: Start the trading loop
//! - `status`: Show capital and open positions from the snapshot
//! - `config`: Show the effective configuration

mod run;
mod status;

pub use run::RunArgs;
pub use status::StatusArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "trend-agent")]
#[command(about = "Long-only trend-following agent with staged take-profits on virtual positions")]
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
    /// Show capital and open positions
    Status(StatusArgs),
    /// Show the effective configuration
    Config,
}
