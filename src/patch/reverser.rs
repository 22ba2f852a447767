//! Reverses every edit the applier makes
//!
//! The injected block is free-form text, so removal relies on its start and
//! end markers never occurring anywhere else in the bundle. The exact block
//! shape is tried first; piecewise removal handles blocks that were edited
//! after injection.

use super::catalog::{STYLESHEET_BLOCKS, script_transforms};
use super::encoding::Encoding;
use super::{JS_IDENT, PatchError, SPLIT_MARKER};
use regex::Regex;
use serde::Serialize;

/// The fragment exactly as inserted, including the separator line
const WHOLE_BLOCK: &str = r"(?s)\nvar _ccSessionStart = Date\.now\(\);\n.*?\nfunction CC_MetricsBar\(\{[^}]*\}\)[^\n]*\n.*?\n\}\n\n";

/// Looser shape for minified bundles whose separators were disturbed
const MINIFIED_BLOCK: &str = r"(?s)\n*var _ccSessionStart = Date\.now\(\);.*?function CC_MetricsBar\(\{[^}]*\}\)[^\n]*\n.*?\n\}\n*";

/// Fragment pieces removed one at a time, each down to a single newline
const RESIDUES: [(&str, &str); 10] = [
    ("session start", r"\nvar _ccSessionStart = Date\.now\(\);\n"),
    ("accent color", r#"\nvar _ccAccent = "[^"]*";\n"#),
    ("dim color", r#"\nvar _ccDim = "[^"]*";\n"#),
    ("value helper", r"\nfunction _ccV\([^)]*\)[^\n]*\n"),
    ("icon paths", r"(?s)\nvar _ccP = \{.*?\n\};\n"),
    ("icon helper", r"(?s)\nfunction _ccIcon\([^)]*\).*?\n\}\n"),
    ("bar helper", r"(?s)\nfunction _ccBar\([^)]*\).*?\n\}\n"),
    ("avatar image", r#"\nvar _ccAvatarImg = "[^"]*";\n"#),
    ("avatar helper", r"(?s)\nfunction _ccAvatar\(\).*?\n\}\n"),
    ("metrics component", r"(?s)\nfunction CC_MetricsBar\(\{[^}]*\}.*?\n\}\n"),
];

#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub text: String,
    /// Names of everything that was found and removed or restored
    pub removed: Vec<&'static str>,
}

impl CleanReport {
    pub fn changed(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Remove the injected fragment and call, then revert every catalog edit
pub fn clean_script(text: &str) -> Result<CleanReport, PatchError> {
    let encoding = Encoding::detect(text);
    let mut current = text.to_string();
    let mut removed = Vec::new();

    if let Some(next) = remove_all(WHOLE_BLOCK, &current, "")? {
        current = next;
        removed.push("metrics bar block");
    }

    if encoding == Encoding::Minified && current.contains("var _ccSessionStart = Date.now();") {
        if let Some(next) = remove_all(MINIFIED_BLOCK, &current, "")? {
            current = next;
            removed.push("metrics bar block");
        }
    }

    for (name, pattern) in RESIDUES {
        let re = Regex::new(pattern)?;
        if re.is_match(&current) {
            current = re.replacen(&current, 1, "\n").into_owned();
            removed.push(name);
        }
    }

    // Rejoin a container line that was split for the call
    let split = format!(
        r"\n[ \t]*{JS_IDENT}\.default\.createElement\(CC_MetricsBar,\s*\{{[^}}]*\}}\),?[ \t]*{}\n[ \t]*",
        regex::escape(SPLIT_MARKER)
    );
    let split_removed = remove_all(&split, &current, "")?;
    let had_split = split_removed.is_some();
    if let Some(next) = split_removed {
        current = next;
    }

    let call_line = format!(
        r"\n[ \t]*{JS_IDENT}\.default\.createElement\(CC_MetricsBar,\s*\{{[^}}]*\}}\),?[ \t]*\n"
    );
    let call_inline =
        format!(r"{JS_IDENT}\.default\.createElement\(CC_MetricsBar,\s*\{{[^}}]*\}}\),?");
    let line_removed = remove_all(&call_line, &current, "\n")?;
    let had_line = line_removed.is_some();
    if let Some(next) = line_removed {
        current = next;
    }
    let inline_removed = remove_all(&call_inline, &current, "")?;
    let had_inline = inline_removed.is_some();
    if let Some(next) = inline_removed {
        current = next;
    }
    if had_split || had_line || had_inline {
        removed.push("metrics bar call");
    }

    for transform in script_transforms() {
        let (next, matched) = transform.revert(&current)?;
        current = next;
        if matched {
            removed.push(transform.name);
        }
    }

    tracing::info!(%encoding, removed = removed.len(), "cleaned script");
    Ok(CleanReport {
        text: current,
        removed,
    })
}

/// Drop everything from the first appended block marker to end of text
pub fn clean_stylesheet(text: &str) -> CleanReport {
    let cut = STYLESHEET_BLOCKS
        .iter()
        .filter_map(|block| {
            text.find(&format!("\n{}", block.marker))
                .map(|at| (at, block.name))
        })
        .min_by_key(|(at, _)| *at);

    match cut {
        Some((at, _)) => {
            let removed = STYLESHEET_BLOCKS
                .iter()
                .filter(|block| text[at..].contains(block.marker))
                .map(|block| block.name)
                .collect();
            CleanReport {
                text: text[..at].to_string(),
                removed,
            }
        }
        None => CleanReport {
            text: text.to_string(),
            removed: Vec::new(),
        },
    }
}

fn remove_all(pattern: &str, text: &str, with: &str) -> Result<Option<String>, PatchError> {
    let re = Regex::new(pattern)?;
    Ok(re
        .is_match(text)
        .then(|| re.replace_all(text, with).into_owned()))
}
