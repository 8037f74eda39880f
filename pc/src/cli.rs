//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// progresscoord - distributed progress coordinator
#[derive(Parser)]
#[command(
    name = "pc",
    about = "Distributed progress-reporting coordinator",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/progresscoord/logs/progresscoord.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Print the process role for a topology
    Classify {
        /// Process is the interactive client
        #[arg(long)]
        client: bool,

        /// Process is part of a server
        #[arg(long)]
        server: bool,

        /// Rank of this process
        #[arg(short, long)]
        rank: Option<usize>,

        /// Number of processes in the group
        #[arg(short = 'n', long)]
        processes: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run a simulated distributed update
    Simulate {
        /// Number of satellite ranks
        #[arg(short, long)]
        satellites: Option<usize>,

        /// Progress ticks per stage
        #[arg(long)]
        steps: Option<u32>,

        /// Mean delay between ticks in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Minimum spacing between satellite sends in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Put a client in front of the root
        #[arg(long)]
        client: bool,

        /// Don't draw the progress bar
        #[arg(short, long)]
        quiet: bool,

        /// Output format for the summary
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("progresscoord")
        .join("logs")
        .join("progresscoord.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Output format for command summaries
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}
