//! Error types for the specloop CLI.
//!
//! Every variant here is fatal to the run. Per-unit halts (agent task failure,
//! verification failure) are not errors; they are reported through
//! [`crate::runner::RunOutcome::Halted`] so committed progress stays intact.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for specloop operations.
#[derive(Error, Debug)]
pub enum LoopError {
    /// User provided invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// Source documents could not be discovered or read.
    #[error("Discovery failed: {0}")]
    DiscoveryError(String),

    /// Persisted progress is unreadable, corrupt, or could not be written.
    #[error("Progress storage failed: {0}")]
    StorageError(String),

    /// The agent process could not be started or talked to.
    #[error("Agent invocation failed: {0}")]
    AgentTransport(String),
}

impl LoopError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoopError::UserError(_) => exit_codes::USER_ERROR,
            LoopError::DiscoveryError(_) => exit_codes::USER_ERROR,
            LoopError::StorageError(_) => exit_codes::STORAGE_FAILURE,
            LoopError::AgentTransport(_) => exit_codes::AGENT_FAILURE,
        }
    }
}

/// Result type alias for specloop operations.
pub type Result<T> = std::result::Result<T, LoopError>;
