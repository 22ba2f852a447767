//! Drives the transform catalog against one artifact

use super::anchors::{AnchorKind, Anchors};
use super::catalog::{ACCOUNTING, STYLESHEET_BLOCKS, Transform, VISIBILITY_GATE};
use super::encoding::Encoding;
use super::{INJECTED_COMPONENT, JS_IDENT, PatchError, SPLIT_MARKER};
use crate::template::FragmentRenderer;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Lines after the footer container searched for its first child
const CHILD_SEARCH_LINES: usize = 4;

/// What happened to one transform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Applied { encoding: Encoding },
    Appended,
    Skipped,
    NotFound,
    Failed { reason: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    pub fn changed_text(&self) -> bool {
        matches!(self, Outcome::Applied { .. } | Outcome::Appended)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied { encoding } => write!(f, "OK: patched ({encoding})"),
            Outcome::Appended => f.write_str("OK: appended"),
            Outcome::Skipped => f.write_str("SKIP: already patched"),
            Outcome::NotFound => f.write_str("WARNING: pattern not found"),
            Outcome::Failed { reason } => write!(f, "ERROR: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformReport {
    pub name: &'static str,
    pub outcome: Outcome,
}

/// Patched code artifact plus everything that happened on the way
#[derive(Debug, Clone)]
pub struct ScriptReport {
    pub text: String,
    pub encoding: Encoding,
    pub anchors: Anchors,
    pub transforms: Vec<TransformReport>,
}

impl ScriptReport {
    pub fn has_failures(&self) -> bool {
        self.transforms.iter().any(|t| t.outcome.is_failure())
    }

    pub fn changed(&self) -> bool {
        self.transforms.iter().any(|t| t.outcome.changed_text())
    }
}

#[derive(Debug, Clone)]
pub struct StylesheetReport {
    pub text: String,
    pub transforms: Vec<TransformReport>,
}

impl StylesheetReport {
    pub fn changed(&self) -> bool {
        self.transforms.iter().any(|t| t.outcome.changed_text())
    }
}

/// One entry of the script pipeline
enum Step {
    Catalog(&'static Transform),
    DefineFragment,
    InjectCall,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Catalog(transform) => transform.name,
            Step::DefineFragment => "metrics bar definition",
            Step::InjectCall => "metrics bar call",
        }
    }
}

fn script_steps() -> [Step; 7] {
    [
        Step::Catalog(&ACCOUNTING[0]),
        Step::Catalog(&ACCOUNTING[1]),
        Step::Catalog(&ACCOUNTING[2]),
        Step::Catalog(&ACCOUNTING[3]),
        Step::DefineFragment,
        Step::InjectCall,
        Step::Catalog(&VISIBILITY_GATE),
    ]
}

/// Apply every script transform in order.
///
/// Anchors and encoding are resolved once from the input. A missing
/// enclosing function aborts the whole run so nothing half-patched is
/// handed back for writing.
pub fn patch_script(text: &str, renderer: &FragmentRenderer) -> Result<ScriptReport, PatchError> {
    let encoding = Encoding::detect(text);
    let anchors = Anchors::resolve(text);
    tracing::info!(%encoding, lines = text.split('\n').count(), "patching script");

    let mut current = text.to_string();
    let mut transforms = Vec::new();

    for step in script_steps() {
        let (next, outcome) = match &step {
            Step::Catalog(transform) => transform.apply(&current)?,
            Step::DefineFragment => define_fragment(&current, encoding, &anchors, renderer)?,
            Step::InjectCall => inject_call(&current, encoding, &anchors)?,
        };
        current = next;
        transforms.push(TransformReport {
            name: step.name(),
            outcome,
        });
    }

    Ok(ScriptReport {
        text: current,
        encoding,
        anchors,
        transforms,
    })
}

/// Append each stylesheet block that is not there yet
pub fn patch_stylesheet(text: &str) -> StylesheetReport {
    let mut current = text.to_string();
    let mut transforms = Vec::new();

    for block in &STYLESHEET_BLOCKS {
        let (next, outcome) = block.apply(&current);
        current = next;
        transforms.push(TransformReport {
            name: block.name,
            outcome,
        });
    }

    StylesheetReport {
        text: current,
        transforms,
    }
}

/// Insert the rendered component definition right before the footer function
fn define_fragment(
    text: &str,
    encoding: Encoding,
    anchors: &Anchors,
    renderer: &FragmentRenderer,
) -> Result<(String, Outcome), PatchError> {
    if text.contains(&format!("function {INJECTED_COMPONENT}(")) {
        return Ok((text.to_string(), Outcome::Skipped));
    }

    let function = anchors
        .enclosing_function()
        .ok_or(PatchError::AnchorUnresolved(AnchorKind::EnclosingFunction))?;
    let header = format!("function {function}(");
    let fragment = renderer.render(anchors.react(), anchors.hook())?;

    let patched = match encoding {
        Encoding::Prettified => {
            let mut lines: Vec<&str> = text.split('\n').collect();
            let Some(at) = lines.iter().position(|line| line.contains(&header)) else {
                return Ok((text.to_string(), Outcome::NotFound));
            };
            lines.insert(at, &fragment);
            lines.join("\n")
        }
        // Line-based insertion is unsafe here: a multi-line template literal
        // would swallow the definition as string content
        Encoding::Minified => {
            if !text.contains(&header) {
                return Ok((text.to_string(), Outcome::NotFound));
            }
            text.replacen(&header, &format!("{fragment}\n{header}"), 1)
        }
    };

    tracing::debug!(%function, %encoding, "metrics bar defined");
    Ok((patched, Outcome::Applied { encoding }))
}

/// Add a call to the injected component to the footer container's children
fn inject_call(
    text: &str,
    encoding: Encoding,
    anchors: &Anchors,
) -> Result<(String, Outcome), PatchError> {
    if text.contains(&format!("createElement({INJECTED_COMPONENT}")) {
        return Ok((text.to_string(), Outcome::Skipped));
    }
    if !text.contains(&format!("function {INJECTED_COMPONENT}(")) {
        return Ok((
            text.to_string(),
            Outcome::Failed {
                reason: format!("{INJECTED_COMPONENT} is not defined"),
            },
        ));
    }

    let call = format!(
        "{}.default.createElement({INJECTED_COMPONENT}, {{ session: $ }}),",
        anchors.react()
    );

    let patched = match encoding {
        Encoding::Minified => {
            let container = format!(
                "return {}.default.createElement(\"div\",{{className:{}.inputFooter}},",
                anchors.react(),
                anchors.style()
            );
            text.contains(&container)
                .then(|| text.replacen(&container, &format!("{container}{call}"), 1))
        }
        Encoding::Prettified => inject_call_prettified(text, anchors, &call)?,
    };

    Ok(match patched {
        Some(patched) => (patched, Outcome::Applied { encoding }),
        None => (text.to_string(), Outcome::NotFound),
    })
}

/// Splice the call in beside the footer container's existing first child
fn inject_call_prettified(
    text: &str,
    anchors: &Anchors,
    call: &str,
) -> Result<Option<String>, PatchError> {
    let spaced = format!("{{ className: {}.inputFooter }},", anchors.style());
    let tight = format!("{{className:{}.inputFooter}},", anchors.style());
    // `\b` never matches after a trailing `$`
    let child = Regex::new(&format!(
        r"{JS_IDENT}\.default\.createElement\({}(?:[^$_a-zA-Z0-9]|$)",
        regex::escape(anchors.footer_component())
    ))?;

    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    let Some(at) = lines
        .iter()
        .position(|line| line.contains(&spaced) || line.contains(&tight))
    else {
        return Ok(None);
    };

    if let Some(start) = child.find(&lines[at]).map(|m| m.start()) {
        // Container and first child share a line: split it in two. The
        // container keeps its trailing whitespace so clean can rejoin exactly.
        let line = lines[at].clone();
        let indent = format!("{}  ", leading_whitespace(&line));
        lines[at] = line[..start].to_string();
        lines.insert(at + 1, format!("{indent}{call} {SPLIT_MARKER}"));
        lines.insert(at + 2, format!("{indent}{}", &line[start..]));
        return Ok(Some(lines.join("\n")));
    }

    let end = (at + 1 + CHILD_SEARCH_LINES).min(lines.len());
    let Some(sibling) = (at + 1..end).find(|&i| child.is_match(&lines[i])) else {
        return Ok(None);
    };
    let indent = leading_whitespace(&lines[sibling]).to_string();
    lines.insert(sibling, format!("{indent}{call}"));
    Ok(Some(lines.join("\n")))
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}
