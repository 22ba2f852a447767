//! Patch engine for the webview bundle
//!
//! This module handles:
//! - Classifying the bundle's physical encoding (prettified or minified)
//! - Resolving the build-generated identifiers the edits hook into
//! - Applying the ordered, idempotent transform catalog
//! - Verifying the result against an independent checklist
//! - Reversing every edit to recover the unpatched text
//!
//! Everything here is pure text in, text out. Reading and writing the
//! artifacts is the caller's job.
//!
//! # Example
//!
//! ```ignore
//! use crate::patch::{patch_script, patch_stylesheet, verify};
//! use crate::template::FragmentRenderer;
//!
//! let renderer = FragmentRenderer::new("")?;
//! let script = patch_script(&js, &renderer)?;
//! let stylesheet = patch_stylesheet(&css);
//!
//! let report = verify(&script.text, &stylesheet.text);
//! if report.passed() {
//!     println!("All checks passed");
//! }
//! ```

mod anchors;
mod applier;
mod catalog;
mod encoding;
mod reverser;
mod verification;

#[cfg(test)]
pub(crate) mod fixtures;

pub use anchors::{AnchorKind, Anchors};
pub use applier::{Outcome, TransformReport, patch_script, patch_stylesheet};
pub use encoding::Encoding;
pub use reverser::{clean_script, clean_stylesheet};
pub use verification::{VerifyReport, verify};

use crate::template::TemplateError;
use thiserror::Error;

/// A JavaScript identifier as emitted by the bundler
pub const JS_IDENT: &str = r"[$_a-zA-Z][$_a-zA-Z0-9]*";

/// Name of the component the engine injects
pub const INJECTED_COMPONENT: &str = "CC_MetricsBar";

/// Trails a call that was split off the container's line; clean rejoins there
pub const SPLIT_MARKER: &str = "/* cc-metrics: split */";

/// Hard failures. Anything recoverable is reported as an [`Outcome`].
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("could not resolve the {0} anchor and it has no safe default")]
    AnchorUnresolved(AnchorKind),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to render the metrics fragment: {0}")]
    Template(#[from] TemplateError),
}
