//! Verification gate for specloop.
//!
//! After the agent reports success, the configured steps run in order
//! against the working directory. The first failing step stops the gate and
//! the unit is not committed.

pub mod pipeline;

pub use pipeline::{
    CommandStepRunner, StepResult, StepRunner, StepStatus, VerificationReport, run_all,
    tail_output,
};
