//! Agent boundary for specloop.
//!
//! - **Invoker**: runs the external agent with the task on stdin and captures
//!   its combined output
//! - **Prompt**: builds the task description sent for each unit
//!
//! Agents are plain subprocesses configured by a command line, so any CLI
//! agent (Claude Code, Codex, a shell script) works. The agent's changes are
//! not inspected here; the verification gate decides whether they land.

mod invoker;
pub mod prompt;

pub use invoker::{AgentInvoker, AgentOutcome, AgentStatus, CommandAgent};
