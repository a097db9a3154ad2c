//! specloop: drive a coding agent through an ordered collection of spec documents.
//!
//! This is the main entry point for the `specloop` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and maps both unit halts
//! and fatal errors to distinct exit codes.

pub mod agent;
mod cli;
mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod progress;
pub mod queue;
pub mod runner;
pub mod verify;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::dispatch(cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
