//! CLI argument parsing for specloop.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::context::Overrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// specloop: run numbered spec documents through a coding agent, one at a time.
///
/// Each spec is handed to the agent, then gated by the configured
/// verification commands. Only fully verified specs are recorded as done,
/// so an interrupted or failed run can simply be started again.
#[derive(Parser, Debug)]
#[command(name = "specloop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Defaults to `run` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Options shared by every command.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Config file (default: ./specloop.yaml, optional).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory containing the spec documents.
    #[arg(long, global = true)]
    pub specs_dir: Option<PathBuf>,

    /// Progress file recording completed specs.
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            specs_dir: self.specs_dir.clone(),
            state_file: self.state_file.clone(),
        }
    }
}

/// Available commands for specloop.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Process pending specs until all are done or one fails.
    ///
    /// For each spec: invoke the agent, run verification, record completion.
    /// Stops at the first agent or verification failure.
    Run(RunArgs),

    /// Show completed and pending specs.
    Status,

    /// Write a starter specloop.yaml in the current directory.
    Init(InitArgs),
}

/// Arguments for the `run` command.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Stop after completing this many specs.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_units: Option<u64>,

    /// Print the next spec's task description without running anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `init` command.
#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
