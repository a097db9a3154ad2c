//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::agent::prompt::validate_template;
use crate::error::{LoopError, Result};
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file that must exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LoopError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, falling back to defaults if it is absent.
    ///
    /// A file that exists but fails to parse or validate is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LoopError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| LoopError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `specs_dir`, `spec_pattern`, `state_file`, `state_dir` must be non-empty
    /// - `pause_seconds` must be a finite, non-negative number that fits a `Duration`
    /// - `agent.command` must parse to at least one word
    /// - `agent.timeout_seconds`, when set, must be greater than 0
    /// - every `verify` step needs a unique name and a non-empty command
    /// - `prompt_template`, when set, may only reference `{unit}` and `{spec}`
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("specs_dir", &self.specs_dir),
            ("spec_pattern", &self.spec_pattern),
            ("state_file", &self.state_file),
            ("state_dir", &self.state_dir),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(format!("{} must not be empty", field)));
            }
        }

        if !self.pause_seconds.is_finite() || self.pause_seconds < 0.0 {
            return Err(invalid(format!(
                "pause_seconds must be a non-negative number (found {})",
                self.pause_seconds
            )));
        }
        if Duration::try_from_secs_f64(self.pause_seconds).is_err() {
            return Err(invalid(format!(
                "pause_seconds is too large (found {})",
                self.pause_seconds
            )));
        }

        let words = shell_words::split(&self.agent.command).map_err(|e| {
            invalid(format!(
                "agent.command could not be parsed: {} (command: {})",
                e, self.agent.command
            ))
        })?;
        if words.is_empty() {
            return Err(invalid("agent.command must not be empty".to_string()));
        }

        if self.agent.timeout_seconds == Some(0) {
            return Err(invalid(
                "agent.timeout_seconds must be greater than 0 (omit it to wait indefinitely)"
                    .to_string(),
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        for (i, step) in self.verify.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(invalid(format!("verify step #{} has an empty name", i + 1)));
            }
            if step.command.trim().is_empty() {
                return Err(invalid(format!(
                    "verify step '{}' has an empty command",
                    step.name
                )));
            }
            if !seen.insert(step.name.as_str()) {
                return Err(invalid(format!(
                    "verify step name '{}' is used more than once",
                    step.name
                )));
            }
        }

        if let Some(template) = &self.prompt_template {
            validate_template(template)
                .map_err(|e| invalid(format!("prompt_template is invalid: {}", e)))?;
        }

        Ok(())
    }

    /// Pause inserted after each committed unit.
    ///
    /// Values `validate` rejects map to no pause.
    pub fn pause(&self) -> Duration {
        Duration::try_from_secs_f64(self.pause_seconds).unwrap_or(Duration::ZERO)
    }
}

fn invalid(message: String) -> LoopError {
    LoopError::UserError(format!("config validation failed: {}", message))
}
