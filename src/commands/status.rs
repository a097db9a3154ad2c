//! Implementation of the `specloop status` command.
//!
//! Displays which specs are complete, which are pending, and which spec the
//! next run would pick up. Read-only: never touches the progress file.

use crate::context::{Overrides, RunContext};
use crate::error::Result;
use crate::exit_codes;
use crate::progress::{ProgressRecord, ProgressStore};
use crate::queue::{WorkUnit, discover_units};
use crate::runner::summarize;

/// Snapshot of progress for one spec collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatusReport {
    pub done: Vec<String>,
    pub pending: Vec<String>,
    /// Recorded as done but no longer present in the specs directory.
    pub orphaned: Vec<String>,
}

impl StatusReport {
    pub fn next(&self) -> Option<&str> {
        self.pending.first().map(String::as_str)
    }

    fn build(units: &[WorkUnit], record: &ProgressRecord) -> Self {
        let (done, pending) = summarize(units, record);
        let orphaned = record
            .done
            .iter()
            .filter(|name| !units.iter().any(|unit| &unit.name == *name))
            .cloned()
            .collect();

        Self {
            done: done.into_iter().map(|u| u.name.clone()).collect(),
            pending: pending.into_iter().map(|u| u.name.clone()).collect(),
            orphaned,
        }
    }
}

/// Execute the `specloop status` command.
pub fn cmd_status(overrides: &Overrides) -> Result<i32> {
    let ctx = RunContext::resolve(overrides)?;
    let report = status_in(&ctx)?;

    println!("Spec Status");
    println!("===========");
    println!();
    let config_note = if ctx.config_path.exists() {
        ""
    } else {
        " (not found, using defaults)"
    };
    println!("Config:     {}{}", ctx.config_path.display(), config_note);
    println!("Specs dir:  {}", ctx.specs_dir.display());
    println!("State file: {}", ctx.state_file.display());
    println!();

    let total = report.done.len() + report.pending.len();
    println!("Done ({}/{}):", report.done.len(), total);
    for name in &report.done {
        println!("  [x] {}", name);
    }
    println!();

    println!("Pending ({}):", report.pending.len());
    for name in &report.pending {
        println!("  [ ] {}", name);
    }

    if !report.orphaned.is_empty() {
        println!();
        println!("Recorded but missing from specs dir:");
        for name in &report.orphaned {
            println!("  ? {}", name);
        }
    }

    println!();
    match report.next() {
        Some(name) => println!("Next: {}", name),
        None => println!("All specs completed."),
    }

    Ok(exit_codes::SUCCESS)
}

pub(crate) fn status_in(ctx: &RunContext) -> Result<StatusReport> {
    let units = discover_units(&ctx.specs_dir, &ctx.config.spec_pattern)?;
    let record = ProgressStore::new(&ctx.state_file).load()?;
    Ok(StatusReport::build(&units, &record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoopError;
    use crate::test_support::write_specs;
    use tempfile::TempDir;

    fn setup(specs: &[&str], done: &[&str]) -> (TempDir, RunContext) {
        let temp_dir = TempDir::new().unwrap();
        write_specs(&temp_dir.path().join("specs"), specs);
        let ctx = RunContext::resolve_from(temp_dir.path(), &Overrides::default()).unwrap();

        let store = ProgressStore::new(&ctx.state_file);
        let mut record = store.load().unwrap();
        for name in done {
            record = store.commit(&record, name).unwrap();
        }
        (temp_dir, ctx)
    }

    #[test]
    fn test_status_without_progress_file() {
        let (_temp_dir, ctx) = setup(&["02-b.md", "01-a.md"], &[]);

        let report = status_in(&ctx).unwrap();
        assert!(report.done.is_empty());
        assert_eq!(report.pending, vec!["01-a.md", "02-b.md"]);
        assert_eq!(report.next(), Some("01-a.md"));
        assert!(!ctx.state_file.exists());
    }

    #[test]
    fn test_status_partial_progress() {
        let (_temp_dir, ctx) = setup(&["01-a.md", "02-b.md", "03-c.md"], &["01-a.md"]);

        let report = status_in(&ctx).unwrap();
        assert_eq!(report.done, vec!["01-a.md"]);
        assert_eq!(report.pending, vec!["02-b.md", "03-c.md"]);
        assert_eq!(report.next(), Some("02-b.md"));
    }

    #[test]
    fn test_status_reports_orphaned_entries() {
        let (_temp_dir, ctx) = setup(&["01-a.md"], &["00-removed.md", "01-a.md"]);

        let report = status_in(&ctx).unwrap();
        assert_eq!(report.done, vec!["01-a.md"]);
        assert_eq!(report.orphaned, vec!["00-removed.md"]);
        assert_eq!(report.next(), None);
    }

    #[test]
    fn test_status_corrupt_progress_file() {
        let (_temp_dir, ctx) = setup(&["01-a.md"], &[]);
        std::fs::write(&ctx.state_file, "{\"done\": 5}").unwrap();

        let err = status_in(&ctx).unwrap_err();
        assert!(matches!(err, LoopError::StorageError(_)));
    }
}
