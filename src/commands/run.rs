//! Implementation of the `specloop run` command.
//!
//! Wires the configured agent command, verification steps, progress file and
//! event log into an [`Orchestrator`] and reports how the run ended.

use crate::agent::CommandAgent;
use crate::cli::RunArgs;
use crate::context::{Overrides, RunContext};
use crate::error::Result;
use crate::events::EventLog;
use crate::progress::ProgressStore;
use crate::queue::discover_units;
use crate::runner::{Orchestrator, RunOptions, RunOutcome};
use crate::verify::CommandStepRunner;

/// Execute the `specloop run` command.
pub fn cmd_run(overrides: &Overrides, args: &RunArgs) -> Result<i32> {
    let ctx = RunContext::resolve(overrides)?;
    let outcome = run_in(&ctx, args)?;
    print_outcome(&ctx, &outcome);
    Ok(outcome.exit_code())
}

/// Run the loop for an already-resolved context.
pub(crate) fn run_in(ctx: &RunContext, args: &RunArgs) -> Result<RunOutcome> {
    let units = discover_units(&ctx.specs_dir, &ctx.config.spec_pattern)?;

    let events = if args.dry_run {
        EventLog::disabled()
    } else {
        EventLog::new(ctx.events_file())
    };

    let mut orchestrator = Orchestrator::new(
        ProgressStore::new(&ctx.state_file),
        CommandAgent::new(ctx.config.agent.clone(), &ctx.root),
        CommandStepRunner::new(&ctx.root),
    )
    .with_steps(ctx.config.verify.clone())
    .with_prompt_template(ctx.config.prompt_template.clone())
    .with_events(events)
    .with_pause(ctx.config.pause());

    let options = RunOptions {
        max_units: args.max_units.map(|n| n as usize),
        dry_run: args.dry_run,
    };

    orchestrator.run(&units, &options)
}

fn print_outcome(ctx: &RunContext, outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Done { completed } => {
            println!("{} spec(s) completed this run.", completed.len());
        }
        RunOutcome::Stopped { completed } => {
            println!(
                "{} spec(s) completed this run. Run again to continue.",
                completed.len()
            );
        }
        RunOutcome::DryRun { unit, task } => {
            println!("Dry run: next spec is {}.", unit);
            println!("Task description ({} bytes):", task.len());
            println!("----------------------------------------");
            println!("{}", task.trim_end());
            println!("----------------------------------------");
        }
        RunOutcome::Halted { halt, completed } => {
            eprintln!();
            eprintln!("{}", halt.summary());
            if !halt.diagnostic.trim().is_empty() {
                eprintln!();
                eprintln!("Output (last lines):");
                eprintln!("```");
                eprintln!("{}", halt.diagnostic);
                eprintln!("```");
            }
            eprintln!();
            eprintln!(
                "{} spec(s) completed this run; progress is saved in {}.",
                completed.len(),
                ctx.state_file.display()
            );
            eprintln!("Re-run specloop to retry {} from the start.", halt.unit);
        }
    }
}
