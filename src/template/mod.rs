//! Fragment rendering for the injected metrics bar
//!
//! The UI fragment is a Jinja template compiled into the binary. It carries
//! three placeholders that are filled per run:
//!
//! - `{{ react }}`: the bundle's rendering-library handle
//! - `{{ hook }}`: the reactivity trigger called at the top of the component
//! - `{{ avatar }}`: base64 image payload, empty when none is configured
//!
//! # Example
//!
//! ```ignore
//! use crate::template::FragmentRenderer;
//!
//! let renderer = FragmentRenderer::new("")?;
//! let fragment = renderer.render("o4", "MZ")?;
//! assert!(fragment.contains("function CC_MetricsBar("));
//! ```

mod engine;
mod errors;

pub use engine::FragmentRenderer;
pub use errors::TemplateError;
