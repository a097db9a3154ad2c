//! Verification command pipeline.
//!
//! Steps run strictly in order and the pipeline short-circuits: once a step
//! fails, later steps are never started, since they usually assume the
//! earlier ones passed (a build after a type check, tests after a build).

use crate::config::VerificationStep;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Maximum number of output lines kept in diagnostics.
pub const DIAGNOSTIC_MAX_LINES: usize = 50;

/// Maximum total characters kept in diagnostics.
pub const DIAGNOSTIC_MAX_CHARS: usize = 4096;

/// Status of a verification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pass,
    Fail,
}

/// Result of a single verification step.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub name: String,
    pub status: StepStatus,
    /// Exit code, when the command ran to completion.
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr, or a diagnostic if the command never ran.
    pub output: String,
    pub duration: Duration,
}

impl StepResult {
    pub fn pass(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Pass,
            exit_code: Some(0),
            output: output.into(),
            duration: Duration::ZERO,
        }
    }

    pub fn fail(name: impl Into<String>, exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Fail,
            exit_code,
            output: output.into(),
            duration: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Pass
    }
}

/// Outcome of running the verification gate for one unit.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    /// Results of the steps that actually ran, in order.
    pub results: Vec<StepResult>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(StepResult::is_success)
    }

    pub fn first_failure(&self) -> Option<&StepResult> {
        self.results.iter().find(|r| !r.is_success())
    }
}

/// Executes a single verification step.
pub trait StepRunner {
    fn run_step(&mut self, step: &VerificationStep) -> StepResult;
}

/// Run `steps` in order, stopping at the first failure.
pub fn run_all<R: StepRunner + ?Sized>(
    runner: &mut R,
    steps: &[VerificationStep],
) -> VerificationReport {
    let mut report = VerificationReport::default();

    for step in steps {
        let result = runner.run_step(step);
        let failed = !result.is_success();
        report.results.push(result);
        if failed {
            break;
        }
    }

    report
}

/// Runs steps as child processes in a fixed working directory.
#[derive(Debug, Clone)]
pub struct CommandStepRunner {
    workdir: PathBuf,
}

impl CommandStepRunner {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }
}

impl StepRunner for CommandStepRunner {
    fn run_step(&mut self, step: &VerificationStep) -> StepResult {
        let start = Instant::now();
        let mut result = run_command_step(&step.name, &step.command, &self.workdir);
        result.duration = start.elapsed();
        result
    }
}

fn run_command_step(name: &str, command: &str, workdir: &Path) -> StepResult {
    let command = command.trim();
    if command.is_empty() {
        return StepResult::fail(name, None, "command is empty");
    }

    let args = match shell_words::split(command) {
        Ok(args) => args,
        Err(e) => {
            return StepResult::fail(
                name,
                None,
                format!(
                    "failed to parse command: {}\nCommand: {}\nFix: check for unmatched quotes or invalid escape sequences.",
                    e, command
                ),
            );
        }
    };

    let Some((program, cmd_args)) = args.split_first() else {
        return StepResult::fail(
            name,
            None,
            format!("command is empty after parsing.\nCommand: {}", command),
        );
    };

    let output = match Command::new(program)
        .args(cmd_args)
        .current_dir(workdir)
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            return StepResult::fail(
                name,
                None,
                format!(
                    "failed to execute command: {}\nCommand: {}\nFix: ensure the command is installed and in PATH.",
                    e, command
                ),
            );
        }
    };

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        StepResult::pass(name, combined)
    } else {
        StepResult::fail(name, output.status.code(), combined)
    }
}

/// Keep the last [`DIAGNOSTIC_MAX_LINES`] lines of `output`, capped at
/// [`DIAGNOSTIC_MAX_CHARS`] bytes. Failures are usually reported at the end.
pub fn tail_output(output: &str) -> String {
    truncate_output(output, DIAGNOSTIC_MAX_LINES, DIAGNOSTIC_MAX_CHARS)
}

fn truncate_output(output: &str, max_lines: usize, max_chars: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    let relevant_lines = if lines.len() > max_lines {
        &lines[lines.len() - max_lines..]
    } else {
        &lines[..]
    };

    let result = relevant_lines.join("\n");
    if result.len() <= max_chars {
        return result;
    }

    let mut cut = result.len() - max_chars;
    while !result.is_char_boundary(cut) {
        cut += 1;
    }
    format!("...(truncated)...\n{}", &result[cut..])
}
