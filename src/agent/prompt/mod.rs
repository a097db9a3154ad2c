//! Task description generation.
//!
//! Every unit is sent to the agent as one self-contained text: a fixed set of
//! working rules, the report the agent should finish with, and the spec
//! document verbatim. Operators can replace the wrapper with their own
//! `prompt_template`, which may reference `{unit}` (the document file name)
//! and `{spec}` (its full text).

mod template;

pub use template::{TemplateError, check_template, render_template};

use crate::error::{LoopError, Result};

/// Variables available to task description templates.
pub const TEMPLATE_VARIABLES: &[&str] = &["unit", "spec"];

/// Built-in task description.
pub const DEFAULT_TEMPLATE: &str = "\
You are a senior coding agent working in an existing repository.

RULES:
- Implement ONLY what this spec asks.
- Do NOT work ahead or anticipate later specs.
- Make minimal, safe changes.
- Respect the existing architecture, conventions and patterns.
- If something is unclear, stop and explain instead of guessing.

When you are done, report:
1) Summary
2) Files modified
3) Commands run
4) Verification results
5) Risks / follow-ups

SPEC ({unit}):
{spec}
";

/// Build the task description for one unit.
pub fn build_task_description(
    template: Option<&str>,
    unit_name: &str,
    spec_text: &str,
) -> Result<String> {
    let template = template.unwrap_or(DEFAULT_TEMPLATE);
    render_template(template, &[("unit", unit_name), ("spec", spec_text)]).map_err(|e| {
        LoopError::UserError(format!(
            "failed to render task description for '{}': {}",
            unit_name, e
        ))
    })
}

/// Validate a custom template against [`TEMPLATE_VARIABLES`].
pub fn validate_template(template: &str) -> std::result::Result<(), TemplateError> {
    check_template(template, TEMPLATE_VARIABLES)
}
