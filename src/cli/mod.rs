//! CLI module for flightseq
//!
//! Provides the command-line interface:
//! - init: create the data directory
//! - exec: execute one JSON request
//! - serve: execute JSON requests line by line until EOF
//! - show: print the current sequence

mod args;
mod commands;
mod errors;
mod io;
mod requests;

pub use args::{Cli, Command};
pub use commands::{exec, init, run, run_command, serve, show, Config};
pub use errors::{CliError, CliResult};
pub use io::{error_response, ok_response, write_error, write_response};
pub use requests::{handle, handle_line, Request};
