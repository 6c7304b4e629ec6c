//! CLI module
//!
//! Provides the command-line interface:
//! - monitor: run the view monitor
//! - replica: run a replica
//! - view / get / put: one-shot client operations

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::run_command;
pub use errors::{CliError, CliResult};
