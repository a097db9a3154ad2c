//! The orchestration loop.
//!
//! One unit at a time moves through
//! `Selecting -> InvokingAgent -> Verifying -> Committing -> Selecting`
//! until nothing is left (`Done`) or a phase fails (`Halted`).
//!
//! A unit is committed only after the agent succeeded and every verification
//! step passed, so the progress file never holds partial credit. A halted
//! run keeps everything committed before the failing unit; the next run
//! selects that same unit again and starts it over from the agent.
//!
//! Fatal problems (corrupt progress file, unreadable spec, agent binary
//! missing) are returned as `Err`. Unit failures are ordinary outcomes.

use crate::agent::AgentInvoker;
use crate::agent::prompt::build_task_description;
use crate::config::VerificationStep;
use crate::error::Result;
use crate::events::{Event, EventAction, EventLog};
use crate::exit_codes;
use crate::progress::{ProgressRecord, ProgressStore};
use crate::queue::{WorkUnit, next_unit, pending_units};
use crate::verify::{StepRunner, VerificationReport, run_all, tail_output};
use serde_json::json;
use std::fmt;
use std::time::Duration;

/// Per-run knobs that do not belong in the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop cleanly after committing this many units.
    pub max_units: Option<usize>,
    /// Select the next unit and print its task description without running it.
    pub dry_run: bool,
}

/// Phase in which a unit failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltPhase {
    /// The agent exited non-zero or timed out.
    Agent {
        exit_code: Option<i32>,
        timed_out: bool,
    },
    /// A verification step failed.
    Verification {
        step: String,
        exit_code: Option<i32>,
    },
}

impl fmt::Display for HaltPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltPhase::Agent { .. } => write!(f, "agent"),
            HaltPhase::Verification { step, .. } => write!(f, "verify:{}", step),
        }
    }
}

/// Why and where a run stopped on a unit.
#[derive(Debug, Clone)]
pub struct Halt {
    pub unit: String,
    pub phase: HaltPhase,
    /// Tail of the failing process's output.
    pub diagnostic: String,
}

impl Halt {
    pub fn exit_code(&self) -> i32 {
        match self.phase {
            HaltPhase::Agent { .. } => exit_codes::AGENT_FAILURE,
            HaltPhase::Verification { .. } => exit_codes::VERIFICATION_FAILURE,
        }
    }

    /// Operator-facing summary line.
    pub fn summary(&self) -> String {
        match &self.phase {
            HaltPhase::Agent {
                timed_out: true, ..
            } => format!("[agent] {}: agent timed out. Stopping.", self.unit),
            HaltPhase::Agent { exit_code, .. } => format!(
                "[agent] {}: agent execution failed ({}). Stopping.",
                self.unit,
                describe_exit(*exit_code)
            ),
            HaltPhase::Verification { step, exit_code } => format!(
                "[verify:{}] {}: verification failed ({}). Fix before continuing.",
                step,
                self.unit,
                describe_exit(*exit_code)
            ),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// No pending units remain.
    Done { completed: Vec<String> },
    /// `max_units` was reached with units still pending.
    Stopped { completed: Vec<String> },
    /// Dry run: the unit that would run next and its task description.
    DryRun { unit: String, task: String },
    /// A unit failed; nothing was committed for it.
    Halted { halt: Halt, completed: Vec<String> },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Halted { halt, .. } => halt.exit_code(),
            _ => exit_codes::SUCCESS,
        }
    }

    /// Units committed during this run, in order.
    pub fn completed(&self) -> &[String] {
        match self {
            RunOutcome::Done { completed }
            | RunOutcome::Stopped { completed }
            | RunOutcome::Halted { completed, .. } => completed,
            RunOutcome::DryRun { .. } => &[],
        }
    }
}

enum State {
    Selecting,
    InvokingAgent { unit: WorkUnit, task: String },
    Verifying(WorkUnit),
    Committing(WorkUnit),
}

/// Drives units through agent and verification, committing on success.
pub struct Orchestrator<A, R> {
    store: ProgressStore,
    agent: A,
    step_runner: R,
    steps: Vec<VerificationStep>,
    prompt_template: Option<String>,
    events: EventLog,
    pause: Duration,
}

impl<A: AgentInvoker, R: StepRunner> Orchestrator<A, R> {
    pub fn new(store: ProgressStore, agent: A, step_runner: R) -> Self {
        Self {
            store,
            agent,
            step_runner,
            steps: Vec::new(),
            prompt_template: None,
            events: EventLog::disabled(),
            pause: Duration::ZERO,
        }
    }

    pub fn with_steps(mut self, steps: Vec<VerificationStep>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_prompt_template(mut self, template: Option<String>) -> Self {
        self.prompt_template = template;
        self
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn step_runner(&self) -> &R {
        &self.step_runner
    }

    /// Process `units` (sorted by name) until done, stopped, or halted.
    pub fn run(&mut self, units: &[WorkUnit], options: &RunOptions) -> Result<RunOutcome> {
        let mut record = self.store.load()?;
        let mut completed: Vec<String> = Vec::new();

        let pending = pending_units(units, &record).len();
        println!(
            "{} spec(s) found, {} already complete, {} pending.",
            units.len(),
            units.len() - pending,
            pending
        );
        self.events.append(&Event::new(EventAction::RunStart).with_details(json!({
            "units": units.len(),
            "pending": pending,
            "state_file": self.store.path().display().to_string(),
        })))?;

        let mut state = State::Selecting;
        loop {
            state = match state {
                State::Selecting => {
                    if let Some(max) = options.max_units
                        && completed.len() >= max
                    {
                        println!("\nReached --max-units {}. Stopping.", max);
                        return Ok(RunOutcome::Stopped { completed });
                    }

                    let Some(unit) = next_unit(units, &record) else {
                        return self.finish(completed);
                    };

                    println!("\n=== Processing spec: {} ===", unit.name);
                    self.events
                        .append(&Event::new(EventAction::UnitSelected).with_unit(&unit.name))?;

                    let spec_text = unit.read_text()?;
                    let task = build_task_description(
                        self.prompt_template.as_deref(),
                        &unit.name,
                        &spec_text,
                    )?;

                    if options.dry_run {
                        return Ok(RunOutcome::DryRun {
                            unit: unit.name.clone(),
                            task,
                        });
                    }

                    State::InvokingAgent {
                        unit: unit.clone(),
                        task,
                    }
                }

                State::InvokingAgent { unit, task } => {
                    println!("\n$ {}", self.agent.describe());
                    self.events.append(
                        &Event::new(EventAction::AgentDispatch)
                            .with_unit(&unit.name)
                            .with_details(json!({
                                "command": self.agent.describe(),
                                "task_bytes": task.len(),
                            })),
                    )?;

                    let outcome = self.agent.invoke(&task)?;
                    print!("{}", outcome.output);
                    if !outcome.output.is_empty() && !outcome.output.ends_with('\n') {
                        println!();
                    }

                    self.events.append(
                        &Event::new(EventAction::AgentComplete)
                            .with_unit(&unit.name)
                            .with_details(json!({
                                "success": outcome.is_success(),
                                "exit_code": outcome.exit_code,
                                "timed_out": outcome.timed_out,
                                "duration_ms": outcome.duration.as_millis() as u64,
                                "output_tail": tail_output(&outcome.output),
                            })),
                    )?;

                    if !outcome.is_success() {
                        let halt = Halt {
                            unit: unit.name,
                            phase: HaltPhase::Agent {
                                exit_code: outcome.exit_code,
                                timed_out: outcome.timed_out,
                            },
                            diagnostic: tail_output(&outcome.output),
                        };
                        return self.halt(halt, completed);
                    }

                    State::Verifying(unit)
                }

                State::Verifying(unit) => {
                    let report = run_all(&mut self.step_runner, &self.steps);

                    print!("{}", format_verification(&self.steps, &report));

                    self.events.append(
                        &Event::new(EventAction::Verify)
                            .with_unit(&unit.name)
                            .with_details(json!({
                                "passed": report.passed(),
                                "steps": report
                                    .results
                                    .iter()
                                    .map(|r| json!({
                                        "name": r.name,
                                        "success": r.is_success(),
                                        "exit_code": r.exit_code,
                                        "duration_ms": r.duration.as_millis() as u64,
                                    }))
                                    .collect::<Vec<_>>(),
                            })),
                    )?;

                    if let Some(failure) = report.first_failure() {
                        let halt = Halt {
                            unit: unit.name,
                            phase: HaltPhase::Verification {
                                step: failure.name.clone(),
                                exit_code: failure.exit_code,
                            },
                            diagnostic: tail_output(&failure.output),
                        };
                        return self.halt(halt, completed);
                    }

                    State::Committing(unit)
                }

                State::Committing(unit) => {
                    record = self.store.commit(&record, &unit.name)?;
                    println!("Completed {}", unit.name);
                    self.events.append(
                        &Event::new(EventAction::Commit)
                            .with_unit(&unit.name)
                            .with_details(json!({ "completed_total": record.len() })),
                    )?;
                    completed.push(unit.name);

                    if !self.pause.is_zero() && next_unit(units, &record).is_some() {
                        std::thread::sleep(self.pause);
                    }

                    State::Selecting
                }
            };
        }
    }

    fn finish(&self, completed: Vec<String>) -> Result<RunOutcome> {
        println!("\nAll specs completed.");
        self.events.append(
            &Event::new(EventAction::Done).with_details(json!({ "completed_this_run": completed })),
        )?;
        Ok(RunOutcome::Done { completed })
    }

    fn halt(&self, halt: Halt, completed: Vec<String>) -> Result<RunOutcome> {
        self.events.append(
            &Event::new(EventAction::Halt)
                .with_unit(&halt.unit)
                .with_details(json!({
                    "phase": halt.phase.to_string(),
                    "diagnostic": halt.diagnostic,
                })),
        )?;
        Ok(RunOutcome::Halted { halt, completed })
    }
}

/// Progress snapshot used by `status`.
pub fn summarize<'a>(
    units: &'a [WorkUnit],
    record: &ProgressRecord,
) -> (Vec<&'a WorkUnit>, Vec<&'a WorkUnit>) {
    units.iter().partition(|unit| record.contains(&unit.name))
}

/// Console transcript of the steps that ran: command, output tail, verdict.
fn format_verification(steps: &[VerificationStep], report: &VerificationReport) -> String {
    let mut out = String::new();
    // Results come back in step order, stopping at the first failure.
    for (step, result) in steps.iter().zip(&report.results) {
        out.push_str(&format!("\n[verify] {}\n$ {}\n", result.name, step.command));
        let output = tail_output(&result.output);
        if !output.trim().is_empty() {
            out.push_str(&output);
            out.push('\n');
        }
        let mark = if result.is_success() { "ok" } else { "FAILED" };
        out.push_str(&format!("[verify] {} ... {}\n", result.name, mark));
    }
    out
}

fn describe_exit(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}
