//! CLI module for docstore
//!
//! Provides command-line interface for:
//! - serve: Open the store and serve HTTP
//! - shrink: Compact a database file offline

mod args;
mod commands;
mod config;
mod errors;

pub use args::{Cli, Command};
pub use commands::{run, run_command, serve, shrink};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
