//! Implementation of the `specloop init` command.
//!
//! Writes a commented starter `specloop.yaml`. Every key in the starter file
//! matches the built-in default, so running `init` never changes behavior
//! until the file is edited.

use crate::cli::InitArgs;
use crate::config::types::DEFAULT_CONFIG_FILE;
use crate::context::Overrides;
use crate::error::{LoopError, Result};
use crate::exit_codes;
use crate::fs::atomic_write_file;
use std::env;
use std::path::{Path, PathBuf};

const STARTER_CONFIG: &str = r#"# specloop configuration.
# All keys are optional; the values below are the defaults.

# Directory holding the spec documents, relative to this directory.
specs_dir: specs

# Only top-level files matching this glob are treated as specs.
# Specs run in lexicographic order of their file names.
spec_pattern: "*.md"

# Progress file recording which specs are done.
state_file: .ai-loop-state.json

# Directory for the NDJSON event log (events.ndjson).
state_dir: .specloop

# Seconds to wait between specs.
pause_seconds: 1.0

agent:
  # The task description is written to this command's stdin.
  command: "claude -p --permission-mode acceptEdits --add-dir ."
  # Kill the agent after this many seconds (omit for no limit).
  # timeout_seconds: 1800
  # Extra environment variables for the agent process.
  environment: {}

# Custom task description. {unit} is the spec file name, {spec} its text.
# prompt_template: |
#   Implement the following spec ({unit}):
#   {spec}

# Commands that must all pass before a spec is recorded as done.
# They run in order and stop at the first failure.
verify: []
# verify:
#   - name: typecheck
#     command: pnpm -C apps/crm tsc
#   - name: build
#     command: pnpm -C apps/crm build
"#;

/// Execute the `specloop init` command.
pub fn cmd_init(overrides: &Overrides, args: &InitArgs) -> Result<i32> {
    let cwd = env::current_dir().map_err(|e| {
        LoopError::UserError(format!("failed to get current working directory: {}", e))
    })?;

    let target = match &overrides.config {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => cwd.join(path),
        None => cwd.join(DEFAULT_CONFIG_FILE),
    };

    let path = init_at(&target, args.force)?;

    println!("Wrote {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Put numbered spec documents in specs/ (e.g. 01-setup.md)");
    println!("  2. Add verification commands under `verify:`");
    println!("  3. Run `specloop run`");

    Ok(exit_codes::SUCCESS)
}

/// Write the starter config to `target`.
///
/// An existing file is left alone unless `force` is set.
pub(crate) fn init_at(target: &Path, force: bool) -> Result<PathBuf> {
    if target.exists() && !force {
        return Err(LoopError::UserError(format!(
            "{} already exists.\n\n\
             Fix: edit it directly, or re-run with --force to overwrite it.",
            target.display()
        )));
    }

    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            LoopError::UserError(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    atomic_write_file(target, STARTER_CONFIG)?;
    Ok(target.to_path_buf())
}
