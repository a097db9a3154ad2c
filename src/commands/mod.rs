//! Command implementations for specloop.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Each handler returns the process exit code so that unit
//! failures (which are not errors) can still end the process non-zero.

mod init;
mod run;
mod status;

use crate::cli::{Cli, Command, RunArgs};
use crate::error::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<i32> {
    let overrides = cli.global.overrides();

    match cli.command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Run(args) => run::cmd_run(&overrides, &args),
        Command::Status => status::cmd_status(&overrides),
        Command::Init(args) => init::cmd_init(&overrides, &args),
    }
}
