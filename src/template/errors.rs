//! Template error types with source locations and suggestions

use std::fmt;
use thiserror::Error;

/// Location in a template where an error occurred
#[derive(Debug, Clone, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub template_name: Option<String>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.template_name {
            Some(ref name) => write!(f, "{}:{}", name, self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// Fragment rendering errors
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Placeholder with no value in the render context
    #[error("undefined placeholder '{name}' at {location}{}", .suggestion.as_ref().map(|s| format!(", did you mean '{}'?", s)).unwrap_or_default())]
    UndefinedVariable {
        name: String,
        location: SourceLocation,
        suggestion: Option<String>,
    },

    /// Template failed to compile
    #[error("syntax error at {location}: {message}")]
    SyntaxError {
        message: String,
        location: SourceLocation,
    },

    /// Wrapped minijinja error
    #[error("template error: {0}")]
    Internal(#[from] minijinja::Error),
}

impl TemplateError {
    pub fn undefined_variable_at(
        name: impl Into<String>,
        template_name: &str,
        line: usize,
        known_vars: &[&str],
    ) -> Self {
        let name = name.into();
        let suggestion = suggest_correction(&name, known_vars);
        Self::UndefinedVariable {
            name,
            location: SourceLocation {
                line,
                template_name: Some(template_name.to_string()),
            },
            suggestion,
        }
    }

    pub fn syntax(message: impl Into<String>, template_name: &str, line: usize) -> Self {
        Self::SyntaxError {
            message: message.into(),
            location: SourceLocation {
                line,
                template_name: Some(template_name.to_string()),
            },
        }
    }
}

/// Suggest the closest known placeholder for a typo
pub fn suggest_correction(typo: &str, candidates: &[&str]) -> Option<String> {
    let max_distance = (typo.len() / 2).max(2);
    candidates
        .iter()
        .map(|candidate| (edit_distance(typo, candidate), candidate))
        .filter(|(distance, _)| *distance <= max_distance)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

/// Levenshtein distance, two rows at a time
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
