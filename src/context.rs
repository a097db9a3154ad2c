//! Invocation context for specloop.
//!
//! Every path specloop uses (specs directory, progress file, event log) is
//! resolved against the directory the command was started from. This module
//! turns the raw config plus CLI overrides into absolute paths once, so the
//! rest of the code never consults the process working directory.

use crate::config::Config;
use crate::config::types::DEFAULT_CONFIG_FILE;
use crate::error::{LoopError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Values given on the command line that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub specs_dir: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
}

/// Resolved configuration and paths for one invocation.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Absolute path to the invocation directory.
    pub root: PathBuf,

    /// Config file that was (or would be) read.
    pub config_path: PathBuf,

    /// Effective configuration after applying overrides.
    pub config: Config,

    /// Absolute path to the specs directory.
    pub specs_dir: PathBuf,

    /// Absolute path to the progress file.
    pub state_file: PathBuf,

    /// Absolute path to the event log directory.
    pub state_dir: PathBuf,
}

impl RunContext {
    /// Resolve the context from the current working directory.
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            LoopError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd, overrides)
    }

    /// Resolve the context from a specific directory.
    ///
    /// The default `specloop.yaml` is optional; a config path given
    /// explicitly must exist.
    pub fn resolve_from<P: AsRef<Path>>(root: P, overrides: &Overrides) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let config = match &overrides.config {
            Some(path) => Config::load(join(&root, path))?,
            None => Config::load_or_default(root.join(DEFAULT_CONFIG_FILE))?,
        };

        Ok(Self::with_config(root, config, overrides))
    }

    /// Build a context from an already-loaded config.
    pub fn with_config(root: PathBuf, config: Config, overrides: &Overrides) -> Self {
        let config_path = match &overrides.config {
            Some(path) => join(&root, path),
            None => root.join(DEFAULT_CONFIG_FILE),
        };

        let specs_dir = match &overrides.specs_dir {
            Some(dir) => join(&root, dir),
            None => join(&root, Path::new(&config.specs_dir)),
        };
        let state_file = match &overrides.state_file {
            Some(file) => join(&root, file),
            None => join(&root, Path::new(&config.state_file)),
        };
        let state_dir = join(&root, Path::new(&config.state_dir));

        Self {
            root,
            config_path,
            config,
            specs_dir,
            state_file,
            state_dir,
        }
    }

    /// Get the path to the event log file.
    pub fn events_file(&self) -> PathBuf {
        self.state_dir.join("events.ndjson")
    }
}

fn join(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_defaults_without_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = RunContext::resolve_from(temp_dir.path(), &Overrides::default()).unwrap();

        assert_eq!(ctx.root, temp_dir.path());
        assert_eq!(ctx.config_path, temp_dir.path().join("specloop.yaml"));
        assert_eq!(ctx.specs_dir, temp_dir.path().join("specs"));
        assert_eq!(ctx.state_file, temp_dir.path().join(".ai-loop-state.json"));
        assert_eq!(
            ctx.events_file(),
            temp_dir.path().join(".specloop").join("events.ndjson")
        );
    }

    #[test]
    fn test_resolve_reads_config_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("specloop.yaml"),
            "specs_dir: docs/specs\nstate_file: .progress.json\n",
        )
        .unwrap();

        let ctx = RunContext::resolve_from(temp_dir.path(), &Overrides::default()).unwrap();

        assert_eq!(ctx.specs_dir, temp_dir.path().join("docs/specs"));
        assert_eq!(ctx.state_file, temp_dir.path().join(".progress.json"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("specloop.yaml"),
            "specs_dir: docs/specs\n",
        )
        .unwrap();
        let absolute_state = temp_dir.path().join("elsewhere").join("state.json");

        let overrides = Overrides {
            specs_dir: Some(PathBuf::from("other")),
            state_file: Some(absolute_state.clone()),
            ..Default::default()
        };
        let ctx = RunContext::resolve_from(temp_dir.path(), &overrides).unwrap();

        assert_eq!(ctx.specs_dir, temp_dir.path().join("other"));
        assert_eq!(ctx.state_file, absolute_state);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let overrides = Overrides {
            config: Some(PathBuf::from("missing.yaml")),
            ..Default::default()
        };

        let err = RunContext::resolve_from(temp_dir.path(), &overrides).unwrap_err();
        assert!(matches!(err, LoopError::UserError(_)));
    }

    #[test]
    fn test_explicit_config_path() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("ci.yaml"), "pause_seconds: 0\n").unwrap();
        let overrides = Overrides {
            config: Some(PathBuf::from("ci.yaml")),
            ..Default::default()
        };

        let ctx = RunContext::resolve_from(temp_dir.path(), &overrides).unwrap();
        assert_eq!(ctx.config_path, temp_dir.path().join("ci.yaml"));
        assert!(ctx.config.pause().is_zero());
    }

    #[test]
    fn test_invalid_config_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("specloop.yaml"), "verify: 3\n").unwrap();

        assert!(RunContext::resolve_from(temp_dir.path(), &Overrides::default()).is_err());
    }
}
