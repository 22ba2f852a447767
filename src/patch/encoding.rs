//! Physical layout detection for the webview bundle

use serde::Serialize;
use std::fmt;

/// Bundles with more newline-delimited lines than this are treated as prettified
pub const PRETTIFIED_LINE_THRESHOLD: usize = 5000;

/// The physical encoding of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Expanded, one statement per line
    Prettified,
    /// Collapsed into a handful of very long lines
    Minified,
}

impl Encoding {
    /// Classify text by line count.
    ///
    /// The decision is global for the whole artifact. A text with exactly
    /// [`PRETTIFIED_LINE_THRESHOLD`] lines is minified.
    pub fn detect(text: &str) -> Self {
        if text.split('\n').count() > PRETTIFIED_LINE_THRESHOLD {
            Self::Prettified
        } else {
            Self::Minified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prettified => "prettified",
            Self::Minified => "minified",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
