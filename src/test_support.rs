use crate::agent::{AgentInvoker, AgentOutcome};
use crate::config::VerificationStep;
use crate::error::{LoopError, Result};
use crate::verify::{StepResult, StepRunner};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Write one spec document per name into `dir`, creating it if needed.
///
/// Each document starts with `# Spec <name>` so fakes can tell which unit a
/// task description was built from.
pub(crate) fn write_specs(dir: &Path, names: &[&str]) {
    std::fs::create_dir_all(dir).unwrap();
    for name in names {
        std::fs::write(
            dir.join(name),
            format!("# Spec {}\n\nImplement {}.\n", name, name),
        )
        .unwrap();
    }
}

fn unit_of(task: &str) -> Option<String> {
    task.lines()
        .find_map(|line| line.strip_prefix("# Spec "))
        .map(|name| name.trim().to_string())
}

/// Agent fake that records every task and fails on chosen units.
pub(crate) struct ScriptedAgent {
    pub tasks: Vec<String>,
    fail_units: Vec<String>,
    transport_error: bool,
}

impl ScriptedAgent {
    pub(crate) fn always_succeeds() -> Self {
        Self {
            tasks: Vec::new(),
            fail_units: Vec::new(),
            transport_error: false,
        }
    }

    pub(crate) fn fails_on(units: &[&str]) -> Self {
        Self {
            fail_units: units.iter().map(|u| u.to_string()).collect(),
            ..Self::always_succeeds()
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            transport_error: true,
            ..Self::always_succeeds()
        }
    }

    /// Unit names in the order the agent was asked to work on them.
    pub(crate) fn units_seen(&self) -> Vec<String> {
        self.tasks.iter().filter_map(|task| unit_of(task)).collect()
    }
}

impl AgentInvoker for ScriptedAgent {
    fn invoke(&mut self, task: &str) -> Result<AgentOutcome> {
        if self.transport_error {
            return Err(LoopError::AgentTransport(
                "failed to execute agent command 'fake': not found".to_string(),
            ));
        }

        self.tasks.push(task.to_string());
        let unit = unit_of(task).unwrap_or_default();

        if self.fail_units.contains(&unit) {
            Ok(AgentOutcome::failed(
                Some(1),
                format!("agent failed on {}\n", unit),
            ))
        } else {
            Ok(AgentOutcome::succeeded(format!("implemented {}\n", unit)))
        }
    }

    fn describe(&self) -> String {
        "scripted-agent".to_string()
    }
}

/// Step runner fake that records invoked steps and fails the named ones.
pub(crate) struct ScriptedSteps {
    pub invoked: Vec<String>,
    fail_steps: Vec<String>,
}

impl ScriptedSteps {
    pub(crate) fn passing() -> Self {
        Self {
            invoked: Vec::new(),
            fail_steps: Vec::new(),
        }
    }

    pub(crate) fn failing_at(steps: &[&str]) -> Self {
        Self {
            invoked: Vec::new(),
            fail_steps: steps.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl StepRunner for ScriptedSteps {
    fn run_step(&mut self, step: &VerificationStep) -> StepResult {
        self.invoked.push(step.name.clone());
        if self.fail_steps.contains(&step.name) {
            StepResult::fail(&step.name, Some(1), format!("{} failed\n", step.name))
        } else {
            StepResult::pass(&step.name, format!("{} ok\n", step.name))
        }
    }
}
