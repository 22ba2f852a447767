//! Renders the metrics bar fragment for one bundle

use super::errors::TemplateError;
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior, context};
use regex::Regex;
use std::path::Path;

const FRAGMENT_NAME: &str = "metrics_bar";
const FRAGMENT_SOURCE: &str = include_str!("fragments/metrics_bar.js.j2");
const PLACEHOLDERS: [&str; 3] = ["react", "hook", "avatar"];

/// Fragment renderer
///
/// Wraps minijinja with strict undefined handling. Output is JavaScript, so
/// nothing is escaped and the trailing newline is kept.
pub struct FragmentRenderer {
    env: Environment<'static>,
    source: String,
    avatar: String,
}

impl FragmentRenderer {
    /// Renderer for the built-in fragment with the given avatar payload
    pub fn new(avatar: impl Into<String>) -> Result<Self, TemplateError> {
        Self::with_source(FRAGMENT_SOURCE, avatar)
    }

    /// Renderer that reads its avatar payload from `path`.
    ///
    /// A missing or unreadable file yields an empty payload; the fragment
    /// then renders a broken image rather than failing the run.
    pub fn from_avatar_file(path: Option<&Path>) -> Result<Self, TemplateError> {
        let avatar = match path {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(payload) => payload.trim().to_string(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "avatar payload unreadable");
                    String::new()
                }
            },
            None => {
                tracing::debug!("no avatar configured");
                String::new()
            }
        };
        Self::new(avatar)
    }

    /// Renderer over an arbitrary fragment source
    pub fn with_source(
        source: impl Into<String>,
        avatar: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let source = source.into();
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template_owned(FRAGMENT_NAME, source.clone())
            .map_err(|e| TemplateError::syntax(e.to_string(), FRAGMENT_NAME, e.line().unwrap_or(0)))?;

        Ok(Self {
            env,
            source,
            avatar: avatar.into(),
        })
    }

    /// Render the fragment against the run's resolved handles
    pub fn render(&self, react: &str, hook: &str) -> Result<String, TemplateError> {
        let tmpl = self.env.get_template(FRAGMENT_NAME)?;
        tmpl.render(context! {
            react => react,
            hook => hook,
            avatar => self.avatar.as_str(),
        })
        .map_err(|e| self.convert_error(e))
    }

    fn convert_error(&self, err: minijinja::Error) -> TemplateError {
        if err.kind() != ErrorKind::UndefinedError {
            return TemplateError::Internal(err);
        }

        let line = err.line().unwrap_or(0);
        let name = self
            .source
            .lines()
            .nth(line.saturating_sub(1))
            .and_then(unknown_placeholder)
            .unwrap_or_else(|| "unknown".to_string());
        TemplateError::undefined_variable_at(name, FRAGMENT_NAME, line, &PLACEHOLDERS)
    }
}

/// First `{{ name }}` on a line that is not a known placeholder
fn unknown_placeholder(line: &str) -> Option<String> {
    let re = Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)").ok()?;
    re.captures_iter(line)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|name| !PLACEHOLDERS.contains(name))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_render_builtin_fragment() {
        let renderer = FragmentRenderer::new("QUJD").unwrap();
        let fragment = renderer.render("o4", "MZ").unwrap();

        assert!(fragment.starts_with("\nvar _ccSessionStart = Date.now();\n"));
        assert!(fragment.ends_with("}\n"));
        assert!(fragment.contains("function CC_MetricsBar({ session: S }) {\n  MZ();\n"));
        assert!(fragment.contains("o4.default.createElement("));
        assert!(fragment.contains("o4.useEffect("));
        assert!(fragment.contains("data:image/png;base64,QUJD"));
        assert!(!fragment.contains("{{"));
    }

    #[test]
    fn test_render_does_not_escape() {
        let renderer = FragmentRenderer::new("a<b&\"c").unwrap();
        let fragment = renderer.render("n4", "_Z").unwrap();
        assert!(fragment.contains("base64,a<b&\"c\""));
        assert!(fragment.contains("\"sessionMetrics_cc\""));
    }

    #[test]
    fn test_empty_avatar() {
        let renderer = FragmentRenderer::new("").unwrap();
        let fragment = renderer.render("n4", "_Z").unwrap();
        assert!(fragment.contains("var _ccAvatarImg = \"data:image/png;base64,\";"));
    }

    #[test]
    fn test_undefined_placeholder() {
        let renderer = FragmentRenderer::with_source("x\n{{ raect }}.y\n", "").unwrap();
        let err = renderer.render("n4", "_Z").unwrap_err();
        match err {
            TemplateError::UndefinedVariable {
                name,
                location,
                suggestion,
            } => {
                assert_eq!(name, "raect");
                assert_eq!(location.line, 2);
                assert_eq!(suggestion.as_deref(), Some("react"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builtin_fragment_uses_only_known_placeholders() {
        let unknown: Vec<_> = FRAGMENT_SOURCE
            .lines()
            .enumerate()
            .filter_map(|(i, line)| unknown_placeholder(line).map(|name| (i + 1, name)))
            .collect();
        assert!(unknown.is_empty(), "unknown placeholders: {unknown:?}");
        assert!(FRAGMENT_SOURCE.contains("{{ react }}"));
        assert!(FRAGMENT_SOURCE.contains("{{ hook }}"));
        assert!(FRAGMENT_SOURCE.contains("{{ avatar }}"));
    }

    #[test]
    fn test_syntax_error() {
        let result = FragmentRenderer::with_source("{{ react ", "");
        assert!(matches!(result, Err(TemplateError::SyntaxError { .. })));
    }

    #[test]
    fn test_avatar_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  iVBORw0KGgo  ").unwrap();

        let renderer = FragmentRenderer::from_avatar_file(Some(file.path())).unwrap();
        let fragment = renderer.render("n4", "_Z").unwrap();
        assert!(fragment.contains("base64,iVBORw0KGgo\";"));
    }

    #[test]
    fn test_avatar_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FragmentRenderer::from_avatar_file(Some(&dir.path().join("nope.b64"))).unwrap();
        let fragment = renderer.render("n4", "_Z").unwrap();
        assert!(fragment.contains("base64,\";"));
    }
}
