use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    name = "mstone",
    version,
    about = "Milestone countdown tracker with folders and backups"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Path to the data directory (overrides the configured one)
    #[clap(long, value_parser)]
    pub data_dir: Option<PathBuf>,

    /// Path to the backup directory (overrides the configured one)
    #[clap(long, value_parser)]
    pub backup_dir: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the mstone application
    #[clap(subcommand)]
    pub command: Commands,
}
