//! Configuration types and defaults for specloop.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default config file name, looked up in the invocation directory.
pub const DEFAULT_CONFIG_FILE: &str = "specloop.yaml";

/// Default agent command: Claude Code in print mode, reading the prompt from stdin.
pub const DEFAULT_AGENT_COMMAND: &str = "claude -p --permission-mode acceptEdits --add-dir .";

/// How to launch the external coding agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Command line (shell-words parsed; no shell). The task description is
    /// written to the process's stdin, never passed as an argument.
    pub command: String,

    /// Kill the agent after this many seconds. Unset waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Extra environment variables for the agent process.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_AGENT_COMMAND.to_string(),
            timeout_seconds: None,
            environment: BTreeMap::new(),
        }
    }
}

/// A single gating command run after the agent succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationStep {
    /// Display name for the step (e.g., "typecheck", "build").
    pub name: String,

    /// Command to execute (shell-words parsed; no shell).
    pub command: String,
}

impl VerificationStep {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

// Default value functions for serde
pub(crate) fn default_specs_dir() -> String {
    "specs".to_string()
}
pub(crate) fn default_spec_pattern() -> String {
    "*.md".to_string()
}
pub(crate) fn default_state_file() -> String {
    ".ai-loop-state.json".to_string()
}
pub(crate) fn default_state_dir() -> String {
    ".specloop".to_string()
}
pub(crate) fn default_pause_seconds() -> f64 {
    1.0
}
