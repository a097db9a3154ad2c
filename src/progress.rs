//! Durable record of completed work units.
//!
//! The progress file is a small JSON object:
//!
//! ```json
//! {
//!   "done": [
//!     "01-schema.md",
//!     "02-api.md"
//!   ]
//! }
//! ```
//!
//! Completion is set membership, so names are kept in a `BTreeSet` and written
//! sorted. A missing file means "no progress yet"; a file that exists but does
//! not parse is a fatal [`LoopError::StorageError`]. Nothing in specloop ever
//! removes a name: resetting progress means deleting the file by hand.

use crate::error::{LoopError, Result};
use crate::fs::atomic_write_file;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Set of work unit names that were implemented and verified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Completed unit names.
    #[serde(default)]
    pub done: BTreeSet<String>,
}

impl ProgressRecord {
    /// Whether `unit` has been completed.
    pub fn contains(&self, unit: &str) -> bool {
        self.done.contains(unit)
    }

    /// Number of completed units.
    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self).map_err(|e| {
            LoopError::StorageError(format!("failed to serialize progress record: {}", e))
        })?;
        json.push('\n');
        Ok(json)
    }
}

/// Progress store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the progress file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted record, or an empty one if no file exists yet.
    pub fn load(&self) -> Result<ProgressRecord> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ProgressRecord::default());
            }
            Err(e) => {
                return Err(LoopError::StorageError(format!(
                    "failed to read progress file '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            LoopError::StorageError(format!(
                "progress file '{}' is malformed: {}\n\
                 Fix: repair the file, or delete it to start over.",
                self.path.display(),
                e
            ))
        })
    }

    /// Add `unit` to `record` and persist the result before returning it.
    ///
    /// The file is replaced atomically, so after a crash `load` sees either
    /// the previous record or the new one.
    pub fn commit(&self, record: &ProgressRecord, unit: &str) -> Result<ProgressRecord> {
        let mut next = record.clone();
        next.done.insert(unit.to_string());

        atomic_write_file(&self.path, &next.to_json()?)?;

        Ok(next)
    }
}
