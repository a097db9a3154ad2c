//! Configuration model for specloop.
//!
//! This module defines the Config struct that represents `specloop.yaml` in the
//! invocation directory. The file is optional: every field has a default, and
//! unknown fields are ignored for forward compatibility.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use types::{AgentConfig, VerificationStep};
