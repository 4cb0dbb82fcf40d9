//! CLI argument definitions using clap
//!
//! Commands:
//! - docstore serve [--config <path>] [--db <conn>] [--listen <addr>]
//! - docstore shrink --db <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docstore - an embedded schemaless document store
#[derive(Parser, Debug)]
#[command(name = "docstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the store and serve it over HTTP
    Serve {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Database file, or ":memory:" (overrides the config file)
        #[arg(long)]
        db: Option<String>,

        /// Listen address such as ":9999" (overrides the config file)
        #[arg(long)]
        listen: Option<String>,
    },

    /// Compact a database file down to its live documents
    Shrink {
        /// Database file
        #[arg(long)]
        db: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
