//! CLI module for cc-metrics
//!
//! This module provides:
//! - Command implementations (apply, backup, restore, clean, verify)
//! - Output handlers (console, JSON, quiet)
//!
//! # Example
//!
//! ```ignore
//! use crate::cli::{commands, output};
//!
//! let handler = output::create_handler(output::OutputMode::Console, false);
//! let exit_code = commands::apply(&config, &*handler)?;
//! ```

pub mod commands;
pub mod output;

pub use output::{OutputEvent, OutputMode, create_handler};
