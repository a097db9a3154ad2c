//! Exit code constants for the specloop CLI.
//!
//! - 0: Success (all units complete, or nothing to do)
//! - 1: User error (bad args, bad config, missing specs directory)
//! - 2: Verification failure (a gating step exited non-zero)
//! - 3: Agent failure (agent exited non-zero or could not be run)
//! - 4: Storage failure (progress file unreadable or unwritable)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid config, or a missing source directory.
pub const USER_ERROR: i32 = 1;

/// Verification failure: a gating step failed for the current unit.
pub const VERIFICATION_FAILURE: i32 = 2;

/// Agent failure: the agent exited non-zero, timed out, or could not be spawned.
pub const AGENT_FAILURE: i32 = 3;

/// Storage failure: the progress file is corrupt or could not be persisted.
pub const STORAGE_FAILURE: i32 = 4;
