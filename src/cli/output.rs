//! Output handlers for CLI commands
//!
//! Supports console (line-by-line log), JSON (one event per line), and quiet
//! output modes. Diagnostics go through `tracing`; these handlers carry the
//! user-visible report only.

use crate::patch::{AnchorKind, Encoding, Outcome};
use serde::Serialize;
use std::path::PathBuf;

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

impl OutputMode {
    /// Parse from string
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "quiet" => Self::Quiet,
            _ => Self::Console,
        }
    }
}

/// Events emitted while a command runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    Stage {
        index: usize,
        total: usize,
        title: String,
    },
    Target {
        path: PathBuf,
        bytes: usize,
        encoding: Option<Encoding>,
    },
    Anchor {
        kind: AnchorKind,
        value: Option<String>,
        fallback: bool,
    },
    Transform {
        name: String,
        outcome: Outcome,
    },
    Check {
        label: String,
        passed: bool,
    },
    Copied {
        slot: String,
        path: PathBuf,
        bytes: u64,
    },
    Removed {
        item: String,
    },
    Written {
        path: PathBuf,
        bytes: usize,
    },
    Warning {
        message: String,
    },
    Error {
        message: String,
    },
    Info {
        message: String,
    },
}

/// Output handler trait
pub trait OutputHandler {
    /// Emit an event
    fn emit(&self, event: OutputEvent);

    /// Write the final overall statement
    fn result(&self, success: bool, summary: &str);
}

/// Console output handler
pub struct ConsoleHandler {
    debug: bool,
}

impl ConsoleHandler {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// One console line per event; `None` for events hidden at this verbosity
    fn format(&self, event: &OutputEvent) -> Option<String> {
        let line = match event {
            OutputEvent::Stage {
                index,
                total,
                title,
            } => format!("[{}/{}] {}", index, total, title),
            OutputEvent::Target {
                path,
                bytes,
                encoding,
            } => match encoding {
                Some(encoding) => {
                    format!("  {} ({} bytes, {})", path.display(), bytes, encoding)
                }
                None => format!("  {} ({} bytes)", path.display(), bytes),
            },
            OutputEvent::Anchor {
                kind,
                value,
                fallback,
            } => {
                if !self.debug && !fallback {
                    return None;
                }
                let value = value.as_deref().unwrap_or("<unresolved>");
                if *fallback {
                    format!("  {}: {} (fallback)", kind, value)
                } else {
                    format!("  {}: {}", kind, value)
                }
            }
            OutputEvent::Transform { name, outcome } => format!("  [{}] {}", name, outcome),
            OutputEvent::Check { label, passed } => {
                format!("  {}: {}", if *passed { "PASS" } else { "FAIL" }, label)
            }
            OutputEvent::Copied { slot, path, bytes } => {
                format!("  {} -> {} ({} bytes)", slot, path.display(), bytes)
            }
            OutputEvent::Removed { item } => format!("  removed {}", item),
            OutputEvent::Written { path, bytes } => {
                format!("  wrote {} ({} bytes)", path.display(), bytes)
            }
            OutputEvent::Warning { message } => format!("  WARNING: {}", message),
            OutputEvent::Error { message } => format!("ERROR: {}", message),
            OutputEvent::Info { message } => message.clone(),
        };
        Some(line)
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        if let Some(line) = self.format(&event) {
            eprintln!("{}", line);
        }
    }

    fn result(&self, success: bool, summary: &str) {
        let status = if success { "DONE" } else { "FAILED" };
        println!("{}: {}", status, summary);
    }
}

/// JSON output handler
///
/// One compact object per line so the stream can be read line by line.
pub struct JsonHandler;

impl JsonHandler {
    fn print_json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(s) => println!("{}", s),
            Err(e) => tracing::error!(error = %e, "failed to serialize output event"),
        }
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        self.print_json(&event);
    }

    fn result(&self, success: bool, summary: &str) {
        #[derive(Serialize)]
        struct FinalResult<'a> {
            #[serde(rename = "type")]
            kind: &'static str,
            success: bool,
            summary: &'a str,
        }

        self.print_json(&FinalResult {
            kind: "result",
            success,
            summary,
        });
    }
}

/// Quiet handler that only prints the final statement and errors
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, event: OutputEvent) {
        if let OutputEvent::Error { message } = event {
            eprintln!("ERROR: {}", message);
        }
    }

    fn result(&self, success: bool, summary: &str) {
        let status = if success { "DONE" } else { "FAILED" };
        println!("{}: {}", status, summary);
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode, debug: bool) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler::new(debug)),
        OutputMode::Json => Box::new(JsonHandler),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}
