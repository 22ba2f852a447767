//! Configuration types and loading for cc-metrics

mod loader;

pub use loader::{Overrides, PatchConfig};
