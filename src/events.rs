//! Append-only event log.
//!
//! Each phase of a run is recorded as one JSON object per line (NDJSON) in
//! `<state_dir>/events.ndjson`, so a halted run can be reconstructed after
//! the console output is gone.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: what happened (`run_start`, `unit_selected`, `agent_dispatch`, ...)
//! - `actor`: the owner string (`user@HOST`)
//! - `unit`: optional work unit name
//! - `details`: freeform object with action-specific details
//!
//! Captured process output is tail-truncated before it is logged.

use crate::error::{LoopError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A run started.
    RunStart,
    /// The next pending unit was chosen.
    UnitSelected,
    /// The agent was launched for a unit.
    AgentDispatch,
    /// The agent finished (successfully or not).
    AgentComplete,
    /// The verification gate finished.
    Verify,
    /// A unit was recorded as complete.
    Commit,
    /// The run stopped on a failing unit.
    Halt,
    /// No pending units remain.
    Done,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventAction::RunStart => "run_start",
            EventAction::UnitSelected => "unit_selected",
            EventAction::AgentDispatch => "agent_dispatch",
            EventAction::AgentComplete => "agent_complete",
            EventAction::Verify => "verify",
            EventAction::Commit => "commit",
            EventAction::Halt => "halt",
            EventAction::Done => "done",
        };
        f.write_str(name)
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,
    pub action: EventAction,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub details: Value,
}

impl Event {
    /// Create a new event stamped with the current time and actor.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            unit: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| LoopError::StorageError(format!("failed to serialize event: {}", e)))
    }
}

fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Destination for run events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    /// Log to the given NDJSON file, creating it on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Discard all events.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Append an event as a single line and sync it to disk.
    pub fn append(&self, event: &Event) -> Result<()> {
        let Some(events_file) = &self.path else {
            return Ok(());
        };

        let json_line = event.to_ndjson_line()?;

        if let Some(events_dir) = events_file.parent()
            && !events_dir.as_os_str().is_empty()
            && !events_dir.exists()
        {
            fs::create_dir_all(events_dir).map_err(|e| {
                LoopError::StorageError(format!(
                    "failed to create events directory '{}': {}",
                    events_dir.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(events_file)
            .map_err(|e| {
                LoopError::StorageError(format!(
                    "failed to open events file '{}': {}",
                    events_file.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", json_line).map_err(|e| {
            LoopError::StorageError(format!(
                "failed to write event to '{}': {}",
                events_file.display(),
                e
            ))
        })?;

        file.sync_all().map_err(|e| {
            LoopError::StorageError(format!(
                "failed to sync events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Read every event back, oldest first.
    pub fn read_all(&self) -> Result<Vec<Event>> {
        let Some(events_file) = &self.path else {
            return Ok(Vec::new());
        };
        if !events_file.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(events_file).map_err(|e| {
            LoopError::StorageError(format!(
                "failed to read events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| {
                    LoopError::StorageError(format!(
                        "malformed event in '{}': {}",
                        events_file.display(),
                        e
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::RunStart);

        assert_eq!(event.action, EventAction::RunStart);
        assert!(!event.actor.is_empty());
        assert!(event.unit.is_none());
        let age = Utc::now().signed_duration_since(event.ts);
        assert!(age.num_minutes() < 1);
    }

    #[test]
    fn test_event_with_unit_and_details() {
        let event = Event::new(EventAction::Commit)
            .with_unit("01-a.md")
            .with_details(json!({"completed": 1}));

        assert_eq!(event.unit.as_deref(), Some("01-a.md"));
        assert_eq!(event.details["completed"], 1);
    }

    #[test]
    fn test_event_serialization_is_single_line() {
        let event = Event::new(EventAction::Halt)
            .with_unit("02-b.md")
            .with_details(json!({"output": "line 1\nline 2"}));

        let json_line = event.to_ndjson_line().unwrap();
        assert!(!json_line.contains('\n'));
        assert!(json_line.contains("\"halt\""));

        let parsed: Event = serde_json::from_str(&json_line).unwrap();
        assert_eq!(parsed.action, EventAction::Halt);
        assert_eq!(parsed.details["output"], "line 1\nline 2");
    }

    #[test]
    fn test_event_without_unit_omits_field() {
        let json_line = Event::new(EventAction::Done).to_ndjson_line().unwrap();
        let parsed: Value = serde_json::from_str(&json_line).unwrap();
        assert!(parsed.get("unit").is_none());
    }

    #[test]
    fn test_append_creates_dir_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".specloop").join("events.ndjson");
        let log = EventLog::new(&path);

        log.append(&Event::new(EventAction::RunStart)).unwrap();

        assert!(path.exists());
        assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));
    }

    #[test]
    fn test_append_multiple_lines_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::new(temp_dir.path().join("events.ndjson"));

        log.append(&Event::new(EventAction::RunStart)).unwrap();
        log.append(&Event::new(EventAction::UnitSelected).with_unit("01-a.md"))
            .unwrap();

        let events = log.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, EventAction::RunStart);
        assert_eq!(events[1].action, EventAction::UnitSelected);
        assert_eq!(events[1].unit.as_deref(), Some("01-a.md"));
    }

    #[test]
    fn test_disabled_log_writes_nothing() {
        let log = EventLog::disabled();
        log.append(&Event::new(EventAction::Done)).unwrap();
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_read_all_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::new(temp_dir.path().join("events.ndjson"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_event_action_display_matches_serde() {
        for action in [
            EventAction::RunStart,
            EventAction::UnitSelected,
            EventAction::AgentDispatch,
            EventAction::AgentComplete,
            EventAction::Verify,
            EventAction::Commit,
            EventAction::Halt,
            EventAction::Done,
        ] {
            let serialized = serde_json::to_string(&action).unwrap();
            assert_eq!(serialized, format!("\"{}\"", action));
        }
    }

    #[test]
    fn test_get_actor_string() {
        assert!(get_actor_string().contains('@'));
    }
}
