//! Work unit discovery and selection.
//!
//! A work unit is one source document in the specs directory, identified by
//! its file name. Units are processed in ascending name order, so numbering
//! documents (`01-schema.md`, `02-api.md`, ...) controls the sequence.

use crate::error::{LoopError, Result};
use crate::progress::ProgressRecord;
use globset::{Glob, GlobMatcher};
use std::path::{Path, PathBuf};

/// A single source document to implement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// File name of the document; the identifier stored in progress.
    pub name: String,
    /// Full path to the document.
    pub path: PathBuf,
}

impl WorkUnit {
    /// Read the document text verbatim.
    pub fn read_text(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| {
            LoopError::DiscoveryError(format!(
                "failed to read spec '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

/// List the documents in `dir` whose file name matches `pattern`.
///
/// Only regular files directly inside `dir` are considered. The result is
/// sorted by name so that every run sees the same order.
pub fn discover_units(dir: &Path, pattern: &str) -> Result<Vec<WorkUnit>> {
    if !dir.is_dir() {
        return Err(LoopError::DiscoveryError(format!(
            "specs folder not found: {}",
            dir.display()
        )));
    }

    let matcher = compile_pattern(pattern)?;

    let entries = std::fs::read_dir(dir).map_err(|e| {
        LoopError::DiscoveryError(format!(
            "failed to read specs folder '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut units = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            LoopError::DiscoveryError(format!(
                "failed to read entry in '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        // Non-UTF-8 names cannot be recorded in the progress file.
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };

        if matcher.is_match(&name) {
            units.push(WorkUnit { name, path });
        }
    }

    units.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(units)
}

/// First unit, in order, that is not yet complete.
pub fn next_unit<'a>(units: &'a [WorkUnit], completed: &ProgressRecord) -> Option<&'a WorkUnit> {
    units.iter().find(|unit| !completed.contains(&unit.name))
}

/// Units not yet complete, in processing order.
pub fn pending_units<'a>(units: &'a [WorkUnit], completed: &ProgressRecord) -> Vec<&'a WorkUnit> {
    units
        .iter()
        .filter(|unit| !completed.contains(&unit.name))
        .collect()
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(LoopError::UserError(
            "spec_pattern must not be empty".to_string(),
        ));
    }

    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| LoopError::UserError(format!("invalid spec_pattern '{}': {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn specs_dir(files: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for file in files {
            std::fs::write(temp_dir.path().join(file), format!("# {}\n", file)).unwrap();
        }
        temp_dir
    }

    fn record(done: &[&str]) -> ProgressRecord {
        ProgressRecord {
            done: done.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_discover_sorts_by_name() {
        let dir = specs_dir(&["10-j.md", "02-b.md", "01-a.md"]);

        let units = discover_units(dir.path(), "*.md").unwrap();
        let names: Vec<_> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["01-a.md", "02-b.md", "10-j.md"]);
        assert_eq!(units[0].path, dir.path().join("01-a.md"));
    }

    #[test]
    fn test_discover_filters_by_pattern() {
        let dir = specs_dir(&["01-a.md", "notes.txt", "02-b.md"]);
        std::fs::create_dir(dir.path().join("drafts.md")).unwrap();

        let units = discover_units(dir.path(), "*.md").unwrap();
        let names: Vec<_> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["01-a.md", "02-b.md"]);
    }

    #[test]
    fn test_discover_ignores_nested_files() {
        let dir = specs_dir(&["01-a.md"]);
        std::fs::create_dir(dir.path().join("archive")).unwrap();
        std::fs::write(dir.path().join("archive").join("00-old.md"), "old").unwrap();

        let units = discover_units(dir.path(), "*.md").unwrap();
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn test_discover_empty_dir() {
        let dir = specs_dir(&[]);
        assert!(discover_units(dir.path(), "*.md").unwrap().is_empty());
    }

    #[test]
    fn test_discover_missing_dir_is_discovery_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = discover_units(&temp_dir.path().join("nope"), "*.md").unwrap_err();
        assert!(matches!(err, LoopError::DiscoveryError(_)));
        assert!(err.to_string().contains("specs folder not found"));
    }

    #[test]
    fn test_discover_invalid_pattern() {
        let dir = specs_dir(&[]);
        let err = discover_units(dir.path(), "[*.md").unwrap_err();
        assert!(matches!(err, LoopError::UserError(_)));
    }

    #[test]
    fn test_next_unit_empty_progress_is_first() {
        let dir = specs_dir(&["02-b.md", "01-a.md", "03-c.md"]);
        let units = discover_units(dir.path(), "*.md").unwrap();

        let next = next_unit(&units, &ProgressRecord::default()).unwrap();
        assert_eq!(next.name, "01-a.md");
    }

    #[test]
    fn test_next_unit_skips_completed() {
        let dir = specs_dir(&["01-a.md", "02-b.md"]);
        let units = discover_units(dir.path(), "*.md").unwrap();

        let next = next_unit(&units, &record(&["01-a.md"])).unwrap();
        assert_eq!(next.name, "02-b.md");
    }

    #[test]
    fn test_next_unit_fills_gaps_in_order() {
        let dir = specs_dir(&["01-a.md", "02-b.md", "03-c.md"]);
        let units = discover_units(dir.path(), "*.md").unwrap();

        let next = next_unit(&units, &record(&["01-a.md", "03-c.md"])).unwrap();
        assert_eq!(next.name, "02-b.md");
    }

    #[test]
    fn test_next_unit_is_idempotent() {
        let dir = specs_dir(&["01-a.md", "02-b.md"]);
        let units = discover_units(dir.path(), "*.md").unwrap();
        let done = record(&["01-a.md"]);

        let first = next_unit(&units, &done).cloned();
        let second = next_unit(&units, &done).cloned();
        assert_eq!(first, second);
        assert_eq!(done, record(&["01-a.md"]));
    }

    #[test]
    fn test_next_unit_all_done() {
        let dir = specs_dir(&["01-a.md", "02-b.md"]);
        let units = discover_units(dir.path(), "*.md").unwrap();

        assert!(next_unit(&units, &record(&["01-a.md", "02-b.md"])).is_none());
    }

    #[test]
    fn test_next_unit_no_units() {
        assert!(next_unit(&[], &ProgressRecord::default()).is_none());
    }

    #[test]
    fn test_completed_names_not_on_disk_are_ignored() {
        let dir = specs_dir(&["01-a.md"]);
        let units = discover_units(dir.path(), "*.md").unwrap();

        let next = next_unit(&units, &record(&["00-removed.md"])).unwrap();
        assert_eq!(next.name, "01-a.md");
    }

    #[test]
    fn test_pending_units() {
        let dir = specs_dir(&["01-a.md", "02-b.md", "03-c.md"]);
        let units = discover_units(dir.path(), "*.md").unwrap();

        let pending = pending_units(&units, &record(&["02-b.md"]));
        let names: Vec<_> = pending.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["01-a.md", "03-c.md"]);
    }

    #[test]
    fn test_read_text_is_verbatim() {
        let dir = specs_dir(&[]);
        let body = "# Spec\n\n- keep `this` {exactly}\n";
        std::fs::write(dir.path().join("01-a.md"), body).unwrap();
        let units = discover_units(dir.path(), "*.md").unwrap();

        assert_eq!(units[0].read_text().unwrap(), body);
    }
}
