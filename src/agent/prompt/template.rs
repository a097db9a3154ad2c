//! `{variable}` substitution for task description templates.
//!
//! - `{name}` is replaced by the value of `name` (surrounding whitespace in
//!   the name is ignored)
//! - `{{` and `}}` render literal braces; a lone `}` is kept as-is
//! - referencing a variable that was not supplied is an error, never an
//!   empty substitution
//!
//! Values are inserted verbatim and are not themselves scanned for
//! placeholders, so spec documents full of braces are safe.

use thiserror::Error;

/// Error type for template parsing and rendering failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("undefined variable '{name}' at position {position} in template")]
    UndefinedVariable { name: String, position: usize },

    #[error("unmatched '{{' at position {position} in template")]
    UnmatchedBrace { position: usize },

    #[error("empty variable name '{{}}' at position {position} in template")]
    EmptyVariableName { position: usize },
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Text(String),
    Var { name: &'a str, position: usize },
}

/// Split a template into literal text and variable references.
fn parse(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                text.push('{');
            }
            '{' => {
                let start = pos + 1;
                let end = loop {
                    match chars.next() {
                        Some((i, '}')) => break i,
                        Some(_) => {}
                        None => return Err(TemplateError::UnmatchedBrace { position: pos }),
                    }
                };

                let name = template[start..end].trim();
                if name.is_empty() && start == end {
                    return Err(TemplateError::EmptyVariableName { position: pos });
                }

                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Var {
                    name,
                    position: pos,
                });
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                }
                text.push('}');
            }
            _ => text.push(ch),
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Render `template`, substituting each `{name}` from `variables`.
pub fn render_template(template: &str, variables: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());

    for segment in parse(template)? {
        match segment {
            Segment::Text(text) => out.push_str(&text),
            Segment::Var { name, position } => {
                let value = variables
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| TemplateError::UndefinedVariable {
                        name: name.to_string(),
                        position,
                    })?;
                out.push_str(value);
            }
        }
    }

    Ok(out)
}

/// Check that `template` is well-formed and only uses names from `allowed`.
pub fn check_template(template: &str, allowed: &[&str]) -> Result<(), TemplateError> {
    for segment in parse(template)? {
        if let Segment::Var { name, position } = segment
            && !allowed.contains(&name)
        {
            return Err(TemplateError::UndefinedVariable {
                name: name.to_string(),
                position,
            });
        }
    }
    Ok(())
}
