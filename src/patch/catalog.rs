//! The fixed, ordered set of textual edits
//!
//! Every transform is one logical edit with a prettified and a minified
//! projection, plus a single predicate that answers "is this already in the
//! text?". The predicate looks for a marker the patch introduces, never for
//! the pattern it replaces, so a broken pattern cannot hide behind it.

use super::PatchError;
use super::applier::Outcome;
use super::encoding::Encoding;
use regex::Regex;

/// One concrete-syntax projection of a transform
#[derive(Debug)]
pub enum Edit {
    /// Exact substring replacement
    Literal {
        original: &'static str,
        patched: &'static str,
    },
    /// Regex replacement for text with build-varying identifiers inside it
    Pattern {
        find: &'static str,
        replace: &'static str,
        undo_find: &'static str,
        undo_replace: &'static str,
    },
}

impl Edit {
    /// Replace the first match. `None` when the shape is absent.
    pub fn apply(&self, text: &str) -> Result<Option<String>, PatchError> {
        match self {
            Edit::Literal { original, patched } => Ok(text
                .contains(original)
                .then(|| text.replacen(original, patched, 1))),
            Edit::Pattern { find, replace, .. } => {
                let re = Regex::new(find)?;
                Ok(re
                    .is_match(text)
                    .then(|| re.replacen(text, 1, *replace).into_owned()))
            }
        }
    }

    /// Restore every patched occurrence. Returns whether anything matched.
    pub fn revert(&self, text: &str) -> Result<(String, bool), PatchError> {
        match self {
            Edit::Literal { original, patched } => {
                if text.contains(patched) {
                    Ok((text.replace(patched, original), true))
                } else {
                    Ok((text.to_string(), false))
                }
            }
            Edit::Pattern {
                undo_find,
                undo_replace,
                ..
            } => {
                let re = Regex::new(undo_find)?;
                if re.is_match(text) {
                    Ok((re.replace_all(text, *undo_replace).into_owned(), true))
                } else {
                    Ok((text.to_string(), false))
                }
            }
        }
    }
}

/// A named, idempotent, reversible edit
#[derive(Debug)]
pub struct Transform {
    pub name: &'static str,
    applied: fn(&str) -> bool,
    prettified: &'static [Edit],
    minified: &'static [Edit],
}

impl Transform {
    pub fn is_applied(&self, text: &str) -> bool {
        (self.applied)(text)
    }

    /// Run the apply protocol: skip if present, else the first prettified
    /// spelling that matches, else the first minified one.
    pub fn apply(&self, text: &str) -> Result<(String, Outcome), PatchError> {
        if self.is_applied(text) {
            return Ok((text.to_string(), Outcome::Skipped));
        }

        let variants = [
            (Encoding::Prettified, self.prettified),
            (Encoding::Minified, self.minified),
        ];
        for (encoding, edits) in variants {
            for edit in edits {
                if let Some(patched) = edit.apply(text)? {
                    tracing::debug!(transform = self.name, %encoding, "applied");
                    return Ok((patched, Outcome::Applied { encoding }));
                }
            }
        }

        tracing::warn!(transform = self.name, "pattern not found");
        Ok((text.to_string(), Outcome::NotFound))
    }

    /// Undo every spelling unconditionally; absent text is a no-op
    pub fn revert(&self, text: &str) -> Result<(String, bool), PatchError> {
        let mut current = text.to_string();
        let mut any = false;
        for edit in self.prettified.iter().chain(self.minified) {
            let (next, matched) = edit.revert(&current)?;
            current = next;
            any |= matched;
        }
        Ok((current, any))
    }
}

// ─── token accounting: reactive initial state ───

const USAGE_SIGNAL_ORIGINAL: &str = "  usageData = g1({
    totalTokens: 0,
    totalCost: 0,
    contextWindow: 0,
    maxOutputTokens: 0,
  });";

const USAGE_SIGNAL_PATCHED: &str = "  usageData = g1({
    totalTokens: 0,
    totalCost: 0,
    contextWindow: 0,
    maxOutputTokens: 0,
    inputTokens: 0,
    outputTokens: 0,
    cacheCreation: 0,
    cacheRead: 0,
  });";

// The signal constructor name changes per build
const USAGE_SIGNAL_MIN_FIND: &str = r"usageData=([$_a-zA-Z][$_a-zA-Z0-9]*)\(\{totalTokens:0,totalCost:0,contextWindow:0,maxOutputTokens:0\}\)";
const USAGE_SIGNAL_MIN_REPLACE: &str = "usageData=${1}({totalTokens:0,totalCost:0,contextWindow:0,maxOutputTokens:0,inputTokens:0,outputTokens:0,cacheCreation:0,cacheRead:0})";
const USAGE_SIGNAL_MIN_UNDO_FIND: &str = r"usageData=([$_a-zA-Z][$_a-zA-Z0-9]*)\(\{totalTokens:0,totalCost:0,contextWindow:0,maxOutputTokens:0,inputTokens:0,outputTokens:0,cacheCreation:0,cacheRead:0\}\)";
const USAGE_SIGNAL_MIN_UNDO_REPLACE: &str =
    "usageData=${1}({totalTokens:0,totalCost:0,contextWindow:0,maxOutputTokens:0})";

fn usage_signal_applied(text: &str) -> bool {
    text.contains("maxOutputTokens:0,inputTokens:0")
        || text.contains("maxOutputTokens: 0,\n    inputTokens: 0,")
}

// ─── token accounting: per-message usage update ───

const UPDATE_USAGE_ORIGINAL: &str = "    this.usageData.value = {
      totalTokens: J,
      totalCost: Z.totalCost,
      contextWindow: Z.contextWindow,
      maxOutputTokens: Z.maxOutputTokens,
    };
  }";

const UPDATE_USAGE_PATCHED: &str = "    this.usageData.value = {
      totalTokens: J,
      totalCost: Z.totalCost,
      contextWindow: Z.contextWindow,
      maxOutputTokens: Z.maxOutputTokens,
      inputTokens: $.input_tokens || 0,
      outputTokens: (Z.outputTokens || 0) + ($.output_tokens || 0),
      cacheCreation: $.cache_creation_input_tokens || 0,
      cacheRead: $.cache_read_input_tokens || 0,
    };
  }";

const UPDATE_USAGE_MIN_ORIGINAL: &str = "usageData.value={totalTokens:J,totalCost:Z.totalCost,contextWindow:Z.contextWindow,maxOutputTokens:Z.maxOutputTokens}";
const UPDATE_USAGE_MIN_PATCHED: &str = "usageData.value={totalTokens:J,totalCost:Z.totalCost,contextWindow:Z.contextWindow,maxOutputTokens:Z.maxOutputTokens,inputTokens:$.input_tokens||0,outputTokens:(Z.outputTokens||0)+($.output_tokens||0),cacheCreation:$.cache_creation_input_tokens||0,cacheRead:$.cache_read_input_tokens||0}";

fn update_usage_applied(text: &str) -> bool {
    text.contains("inputTokens:$.input_tokens") || text.contains("inputTokens: $.input_tokens")
}

// ─── token accounting: final result message ───

const RESULT_HANDLER_ORIGINAL: &str = "        this.usageData.value = {
          totalTokens: J.totalTokens,
          totalCost: $.total_cost_usd,
          contextWindow: X,
          maxOutputTokens: Q,
        };";

const RESULT_HANDLER_PATCHED: &str = "        this.usageData.value = {
          totalTokens: J.totalTokens,
          totalCost: $.total_cost_usd,
          contextWindow: X,
          maxOutputTokens: Q,
          inputTokens: J.inputTokens || 0,
          outputTokens: J.outputTokens || 0,
          cacheCreation: J.cacheCreation || 0,
          cacheRead: J.cacheRead || 0,
        };";

const RESULT_HANDLER_MIN_ORIGINAL: &str = "usageData.value={totalTokens:J.totalTokens,totalCost:$.total_cost_usd,contextWindow:X,maxOutputTokens:Q}";
const RESULT_HANDLER_MIN_PATCHED: &str = "usageData.value={totalTokens:J.totalTokens,totalCost:$.total_cost_usd,contextWindow:X,maxOutputTokens:Q,inputTokens:J.inputTokens||0,outputTokens:J.outputTokens||0,cacheCreation:J.cacheCreation||0,cacheRead:J.cacheRead||0}";

fn result_handler_applied(text: &str) -> bool {
    text.contains("inputTokens:J.inputTokens") || text.contains("inputTokens: J.inputTokens")
}

// ─── token accounting: compaction boundary reset ───

const COMPACT_ORIGINAL: &str = "{ ...this.usageData.value, totalTokens: 0 }";
const COMPACT_PATCHED: &str = "{ ...this.usageData.value, totalTokens: 0, inputTokens: 0, outputTokens: 0, cacheCreation: 0, cacheRead: 0 }";
const COMPACT_MIN_ORIGINAL: &str = "{...this.usageData.value,totalTokens:0}";
const COMPACT_MIN_PATCHED: &str = "{...this.usageData.value,totalTokens:0,inputTokens:0,outputTokens:0,cacheCreation:0,cacheRead:0}";

fn compact_boundary_applied(text: &str) -> bool {
    text.contains("totalTokens:0,inputTokens:0") || text.contains("totalTokens: 0, inputTokens: 0")
}

// ─── visibility gate ───
//
// Each spelling gets its own inert marker so the clean pass restores the
// exact spelling that was removed.

pub const GATE_SPACED: &str = "if (U >= 50) return null;";
pub const GATE_MIN_BRACE: &str = "if(U>=50)return null}";
pub const GATE_MIN_SEMI: &str = "if(U>=50)return null;";

const GATE_SPACED_MARKER: &str = "/* patched: always show */";
const GATE_MIN_BRACE_MARKER: &str = "/*patched:always-show*/}";
const GATE_MIN_SEMI_MARKER: &str = "/*patched:always-show*/;";

fn visibility_gate_applied(text: &str) -> bool {
    text.contains(GATE_SPACED_MARKER) || text.contains("/*patched:always-show*/")
}

/// Transforms that need no anchors, in apply order
pub static ACCOUNTING: [Transform; 4] = [
    Transform {
        name: "usage signal",
        applied: usage_signal_applied,
        prettified: &[Edit::Literal {
            original: USAGE_SIGNAL_ORIGINAL,
            patched: USAGE_SIGNAL_PATCHED,
        }],
        minified: &[Edit::Pattern {
            find: USAGE_SIGNAL_MIN_FIND,
            replace: USAGE_SIGNAL_MIN_REPLACE,
            undo_find: USAGE_SIGNAL_MIN_UNDO_FIND,
            undo_replace: USAGE_SIGNAL_MIN_UNDO_REPLACE,
        }],
    },
    Transform {
        name: "usage update",
        applied: update_usage_applied,
        prettified: &[Edit::Literal {
            original: UPDATE_USAGE_ORIGINAL,
            patched: UPDATE_USAGE_PATCHED,
        }],
        minified: &[Edit::Literal {
            original: UPDATE_USAGE_MIN_ORIGINAL,
            patched: UPDATE_USAGE_MIN_PATCHED,
        }],
    },
    Transform {
        name: "result handler",
        applied: result_handler_applied,
        prettified: &[Edit::Literal {
            original: RESULT_HANDLER_ORIGINAL,
            patched: RESULT_HANDLER_PATCHED,
        }],
        minified: &[Edit::Literal {
            original: RESULT_HANDLER_MIN_ORIGINAL,
            patched: RESULT_HANDLER_MIN_PATCHED,
        }],
    },
    Transform {
        name: "compaction reset",
        applied: compact_boundary_applied,
        prettified: &[Edit::Literal {
            original: COMPACT_ORIGINAL,
            patched: COMPACT_PATCHED,
        }],
        minified: &[Edit::Literal {
            original: COMPACT_MIN_ORIGINAL,
            patched: COMPACT_MIN_PATCHED,
        }],
    },
];

pub static VISIBILITY_GATE: Transform = Transform {
    name: "visibility gate",
    applied: visibility_gate_applied,
    prettified: &[Edit::Literal {
        original: GATE_SPACED,
        patched: GATE_SPACED_MARKER,
    }],
    minified: &[
        Edit::Literal {
            original: GATE_MIN_BRACE,
            patched: GATE_MIN_BRACE_MARKER,
        },
        Edit::Literal {
            original: GATE_MIN_SEMI,
            patched: GATE_MIN_SEMI_MARKER,
        },
    ],
};

/// Every catalog transform, in apply order
pub fn script_transforms() -> impl Iterator<Item = &'static Transform> {
    ACCOUNTING.iter().chain(std::iter::once(&VISIBILITY_GATE))
}

/// A block of rules appended to the end of the stylesheet
#[derive(Debug)]
pub struct AppendBlock {
    pub name: &'static str,
    /// Presence of this string means the block is already there
    pub guard: &'static str,
    /// Leading comment; everything from here to end of file belongs to us
    pub marker: &'static str,
    rules: &'static [&'static str],
}

impl AppendBlock {
    pub fn is_applied(&self, text: &str) -> bool {
        text.contains(self.guard)
    }

    /// The exact text appended to the stylesheet
    pub fn render(&self) -> String {
        let mut block = format!("\n{}", self.marker);
        for rule in self.rules {
            block.push('\n');
            block.push_str(rule);
        }
        block
    }

    pub fn apply(&self, text: &str) -> (String, Outcome) {
        if self.is_applied(text) {
            return (text.to_string(), Outcome::Skipped);
        }
        (format!("{}{}", text, self.render()), Outcome::Appended)
    }
}

pub static STYLESHEET_BLOCKS: [AppendBlock; 2] = [
    AppendBlock {
        name: "metrics layout",
        guard: ".sessionMetrics_cc",
        marker: "/* cc-metrics: session metrics bar */",
        rules: &[
            ".inputFooter_gGYT1w{flex-wrap:wrap !important}",
            ".sessionMetrics_cc{flex:0 0 100% !important;order:-1 !important}",
        ],
    },
    AppendBlock {
        name: "accent palette",
        guard: "/* cc-metrics: accent palette */",
        marker: "/* cc-metrics: accent palette */",
        rules: &[
            ":root{--app-claude-orange:#e04040 !important;--app-claude-clay-button-orange:#b82030 !important}",
            ".inputContainer_cKsPxg{border-color:rgba(224,64,64,0.25) !important}",
            ".inputContainer_cKsPxg:focus-within{border-color:#e04040 !important;box-shadow:0 0 6px rgba(224,64,64,0.3) !important}",
            ".inputFooter_gGYT1w{border-top-color:rgba(224,64,64,0.15) !important}",
        ],
    },
];
