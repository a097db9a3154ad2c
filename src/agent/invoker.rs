//! Agent subprocess invocation.
//!
//! The task description is streamed to the child's stdin so payload size is
//! never limited by the platform's argument length. stdout and stderr are
//! drained on their own threads while the main thread waits, which keeps a
//! chatty agent from blocking on a full pipe.

use crate::config::AgentConfig;
use crate::error::{LoopError, Result};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long to wait for agent pipes to drain after a timeout kill.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Whether the agent reported success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Succeeded,
    Failed,
}

/// Result of one agent invocation.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub status: AgentStatus,
    /// Exit code of the process (None if killed by a signal or on timeout).
    pub exit_code: Option<i32>,
    /// Captured stdout followed by stderr.
    pub output: String,
    pub duration: Duration,
    /// Whether the process was killed due to timeout.
    pub timed_out: bool,
}

impl AgentOutcome {
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Succeeded,
            exit_code: Some(0),
            output: output.into(),
            duration: Duration::ZERO,
            timed_out: false,
        }
    }

    pub fn failed(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Failed,
            exit_code,
            output: output.into(),
            duration: Duration::ZERO,
            timed_out: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AgentStatus::Succeeded
    }

    /// One-line description of how the agent finished.
    pub fn describe(&self) -> String {
        if self.timed_out {
            return format!("timed out after {:.1}s", self.duration.as_secs_f64());
        }
        match self.exit_code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Boundary to the external coding agent.
pub trait AgentInvoker {
    /// Run the agent on `task` and block until it finishes.
    ///
    /// `Err` is reserved for transport failures (the agent could not be
    /// started or its pipes broke). An agent that ran and exited non-zero is
    /// an `Ok` outcome with [`AgentStatus::Failed`].
    fn invoke(&mut self, task: &str) -> Result<AgentOutcome>;

    /// Human-readable command, for logs.
    fn describe(&self) -> String;
}

/// Runs the agent as a child process in a fixed working directory.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    config: AgentConfig,
    workdir: PathBuf,
}

impl CommandAgent {
    pub fn new(config: AgentConfig, workdir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            workdir: workdir.into(),
        }
    }

    fn build_command(&self) -> Result<Command> {
        let args = shell_words::split(&self.config.command).map_err(|e| {
            LoopError::UserError(format!(
                "failed to parse agent command '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                self.config.command, e
            ))
        })?;

        let Some((program, rest)) = args.split_first() else {
            return Err(LoopError::UserError(format!(
                "agent command is empty after parsing: '{}'",
                self.config.command
            )));
        };

        let mut command = Command::new(program);
        command
            .args(rest)
            .current_dir(&self.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .envs(&self.config.environment);

        // A timed-out agent is killed together with its tool subprocesses,
        // which only works if it leads its own process group.
        #[cfg(unix)]
        if self.config.timeout_seconds.is_some() {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        Ok(command)
    }
}

impl AgentInvoker for CommandAgent {
    fn invoke(&mut self, task: &str) -> Result<AgentOutcome> {
        let mut command = self.build_command()?;

        let start_time = Instant::now();
        let mut child = command.spawn().map_err(|e| {
            LoopError::AgentTransport(format!(
                "failed to execute agent command '{}': {}\n\
                 Fix: ensure the command is installed and in PATH.",
                self.config.command, e
            ))
        })?;

        let stdin = child.stdin.take();
        let payload = task.to_owned();
        let writer = thread::spawn(move || -> io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(payload.as_bytes())?;
            }
            // Dropping stdin closes the pipe so the agent sees EOF.
            Ok(())
        });
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let (exit_code, timed_out) = match self.config.timeout_seconds {
            Some(secs) => wait_with_timeout(&mut child, Duration::from_secs(secs))?,
            None => {
                let status = child.wait().map_err(|e| {
                    LoopError::AgentTransport(format!("failed to wait for agent: {}", e))
                })?;
                (status.code(), false)
            }
        };
        let duration = start_time.elapsed();

        // After a kill, anything that escaped the process group may still
        // hold the pipes open. Give the I/O threads a short grace period
        // instead of waiting on it.
        let grace = timed_out.then_some(KILL_GRACE);

        match finish(writer, "stdin writer", grace)?.unwrap_or(Ok(())) {
            Ok(()) => {}
            // The agent exited without reading everything; its exit status decides.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Err(e) => {
                return Err(LoopError::AgentTransport(format!(
                    "failed to send task to agent: {}",
                    e
                )));
            }
        }

        let stdout = collect(stdout_reader, "stdout", grace)?;
        let stderr = collect(stderr_reader, "stderr", grace)?;

        let mut output = String::from_utf8_lossy(&stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&stderr));

        let status = if !timed_out && exit_code == Some(0) {
            AgentStatus::Succeeded
        } else {
            AgentStatus::Failed
        };

        Ok(AgentOutcome {
            status,
            exit_code,
            output,
            duration,
            timed_out,
        })
    }

    fn describe(&self) -> String {
        self.config.command.clone()
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            source.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

/// Join an I/O thread. With a grace period, gives up (returning `None`)
/// if the thread is still blocked once it elapses.
fn finish<T>(handle: JoinHandle<T>, what: &str, grace: Option<Duration>) -> Result<Option<T>> {
    if let Some(grace) = grace {
        let deadline = Instant::now() + grace;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                // The thread is left detached; it ends when the pipe closes.
                return Ok(None);
            }
            thread::sleep(Duration::from_millis(20));
        }
    }

    handle
        .join()
        .map(Some)
        .map_err(|_| LoopError::AgentTransport(format!("agent {} thread panicked", what)))
}

fn collect(
    reader: JoinHandle<io::Result<Vec<u8>>>,
    stream: &str,
    grace: Option<Duration>,
) -> Result<Vec<u8>> {
    match finish(reader, &format!("{} reader", stream), grace)? {
        Some(result) => result.map_err(|e| {
            LoopError::AgentTransport(format!("failed to read agent {}: {}", stream, e))
        }),
        None => Ok(Vec::new()),
    }
}

/// Wait for a child process with timeout.
///
/// Returns (exit_code, timed_out).
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<(Option<i32>, bool)> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(100);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status.code(), false)),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_agent(child);
                    let _ = child.wait();
                    return Ok((None, true));
                }
                thread::sleep(poll_interval);
            }
            Err(e) => {
                return Err(LoopError::AgentTransport(format!(
                    "failed to check agent process status: {}",
                    e
                )));
            }
        }
    }
}

/// Kill the agent and every process in its group.
#[cfg(unix)]
fn kill_agent(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    // The group id equals the child's pid (see `build_command`).
    if let Ok(pid) = i32::try_from(child.id()) {
        let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
    }
    let _ = child.kill();
}

/// TerminateProcess on the direct child only.
#[cfg(not(unix))]
fn kill_agent(child: &mut Child) {
    let _ = child.kill();
}
