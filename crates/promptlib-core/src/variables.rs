//! `{{ name }}` placeholder substitution for prompt bodies.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::VariableError;

static VARIABLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").unwrap());

/// Result of rendering a prompt body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Placeholders that had no assignment and were left in place.
    pub missing: BTreeSet<String>,
    /// Assignments that were substituted at least once.
    pub used: BTreeSet<String>,
}

/// Substitute `{{ name }}` placeholders from `assignments`.
///
/// With no assignments the body is returned untouched and nothing is
/// reported missing.
pub fn apply_variables(body: &str, assignments: &HashMap<String, String>) -> Rendered {
    let mut missing = BTreeSet::new();
    let mut used = BTreeSet::new();
    if assignments.is_empty() {
        return Rendered {
            text: body.to_string(),
            missing,
            used,
        };
    }

    let text = VARIABLE_PATTERN
        .replace_all(body, |caps: &Captures<'_>| {
            let name = &caps[1];
            match assignments.get(name) {
                Some(value) => {
                    used.insert(name.to_string());
                    value.clone()
                }
                None => {
                    missing.insert(name.to_string());
                    caps[0].to_string()
                }
            }
        })
        .into_owned();

    Rendered {
        text,
        missing,
        used,
    }
}

/// Split a `KEY=VALUE` assignment on its first `=`.
///
/// The key is trimmed and must not be blank; the value is kept verbatim.
pub fn parse_assignment(raw: &str) -> Result<(String, String), VariableError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| VariableError::MissingSeparator(raw.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(VariableError::BlankName);
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitutes_and_reports() {
        let out = apply_variables(
            "Review {{ repo }} for {{author}} ({{ repo }}), see {{ ticket.id }}",
            &vars(&[("repo", "promptlib"), ("author", "sam"), ("unused", "x")]),
        );
        assert_eq!(out.text, "Review promptlib for sam (promptlib), see {{ ticket.id }}");
        assert_eq!(out.used.into_iter().collect::<Vec<_>>(), ["author", "repo"]);
        assert_eq!(out.missing.into_iter().collect::<Vec<_>>(), ["ticket.id"]);
    }

    #[test]
    fn test_no_assignments_is_identity() {
        let out = apply_variables("Hello {{ name }}", &HashMap::new());
        assert_eq!(out.text, "Hello {{ name }}");
        assert!(out.missing.is_empty());
        assert!(out.used.is_empty());
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment(" repo =a=b").unwrap(),
            ("repo".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_assignment("novalue"),
            Err(VariableError::MissingSeparator("novalue".to_string()))
        );
        assert_eq!(parse_assignment(" =x"), Err(VariableError::BlankName));
        assert_eq!(
            parse_assignment("novalue").unwrap_err().to_string(),
            "invalid variable assignment 'novalue': expected KEY=VALUE"
        );
    }
}
