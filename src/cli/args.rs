//! CLI argument definitions using clap
//!
//! Commands:
//! - flightseq init --config <path>
//! - flightseq exec --config <path>
//! - flightseq serve --config <path>
//! - flightseq show --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// flightseq - durable ordered flight sequence
#[derive(Parser, Debug)]
#[command(name = "flightseq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./flightseq.json")]
        config: PathBuf,
    },

    /// Execute one JSON request from stdin and exit
    Exec {
        /// Path to configuration file
        #[arg(long, default_value = "./flightseq.json")]
        config: PathBuf,
    },

    /// Execute JSON requests from stdin, one per line, until EOF
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./flightseq.json")]
        config: PathBuf,
    },

    /// Print the current sequence
    Show {
        /// Path to configuration file
        #[arg(long, default_value = "./flightseq.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
