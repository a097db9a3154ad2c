//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a specloop run.
///
/// Relative paths are resolved against the invocation directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Source documents
    // =========================================================================
    /// Directory holding one spec document per work unit.
    #[serde(default = "default_specs_dir")]
    pub specs_dir: String,

    /// Glob matched against file names in `specs_dir`.
    #[serde(default = "default_spec_pattern")]
    pub spec_pattern: String,

    // =========================================================================
    // State
    // =========================================================================
    /// Progress file recording completed units.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Directory for the event log.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Seconds to pause after each committed unit, giving the operator a
    /// window to stop the run cleanly. `0` disables the pause.
    #[serde(default = "default_pause_seconds")]
    pub pause_seconds: f64,

    // =========================================================================
    // Agent
    // =========================================================================
    /// Agent launch settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Custom task description template. Supports `{unit}` and `{spec}`.
    /// When unset the built-in template is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,

    // =========================================================================
    // Verification
    // =========================================================================
    /// Ordered gating commands; the first failure halts the run.
    #[serde(default)]
    pub verify: Vec<VerificationStep>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            specs_dir: default_specs_dir(),
            spec_pattern: default_spec_pattern(),
            state_file: default_state_file(),
            state_dir: default_state_dir(),
            pause_seconds: default_pause_seconds(),
            agent: AgentConfig::default(),
            prompt_template: None,
            verify: Vec::new(),
        }
    }
}
