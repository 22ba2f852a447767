//! CLI command implementations
//!
//! Each command returns the process exit code. Errors that abort a command
//! (discovery, unreadable artifacts) propagate as `anyhow` errors.

use super::output::{OutputEvent, OutputHandler};
use crate::backup::BackupStore;
use crate::config::PatchConfig;
use crate::discovery::{ExtensionPaths, locate_extension};
use crate::patch::{
    Anchors, TransformReport, VerifyReport, clean_script, clean_stylesheet, patch_script,
    patch_stylesheet, verify,
};
use crate::template::FragmentRenderer;
use anyhow::{Context, Result};
use std::path::Path;

/// Patch both artifacts and verify the result
pub fn apply(config: &PatchConfig, handler: &dyn OutputHandler) -> Result<i32> {
    let paths = locate_extension(config)?;
    let renderer = FragmentRenderer::from_avatar_file(config.avatar_path().as_deref())?;
    handler.emit(OutputEvent::Info {
        message: format!("Extension: {}", paths.root.display()),
    });

    handler.emit(stage(1, 3, "Patching webview script"));
    let script = read_artifact(&paths.script)?;
    let script_failed = match patch_script(&script, &renderer) {
        Ok(report) => {
            handler.emit(OutputEvent::Target {
                path: paths.script.clone(),
                bytes: script.len(),
                encoding: Some(report.encoding),
            });
            emit_anchors(handler, &report.anchors);
            emit_transforms(handler, &report.transforms);
            if report.changed() {
                write_artifact(handler, &paths.script, &report.text)?;
            }
            report.has_failures()
        }
        Err(e) => {
            tracing::error!(error = %e, "script left unmodified");
            handler.emit(OutputEvent::Error {
                message: format!("{}; {} was not modified", e, paths.script.display()),
            });
            true
        }
    };

    handler.emit(stage(2, 3, "Patching webview stylesheet"));
    let stylesheet = read_artifact(&paths.stylesheet)?;
    handler.emit(OutputEvent::Target {
        path: paths.stylesheet.clone(),
        bytes: stylesheet.len(),
        encoding: None,
    });
    let report = patch_stylesheet(&stylesheet);
    emit_transforms(handler, &report.transforms);
    if report.changed() {
        write_artifact(handler, &paths.stylesheet, &report.text)?;
    }

    handler.emit(stage(3, 3, "Verifying"));
    let checks = verify_files(&paths)?;
    emit_checks(handler, &checks);

    let failed = checks.failures().count();
    let success = !script_failed && checks.passed();
    let summary = match (script_failed, failed) {
        (false, 0) => "all patches applied and verified".to_string(),
        (true, 0) => "script patching failed".to_string(),
        (_, n) => format!("{} of {} checks failed", n, checks.checks.len()),
    };
    handler.result(success, &summary);

    Ok(if success { 0 } else { 1 })
}

/// Run the checklist against the artifacts as they are on disk
pub fn verify_only(config: &PatchConfig, handler: &dyn OutputHandler) -> Result<i32> {
    let paths = locate_extension(config)?;
    let checks = verify_files(&paths)?;
    emit_checks(handler, &checks);

    if checks.passed() {
        handler.result(true, &format!("all {} checks passed", checks.checks.len()));
        return Ok(0);
    }

    let failed = checks.failures().count();
    handler.result(
        false,
        &format!("{} of {} checks failed", failed, checks.checks.len()),
    );
    Ok(1)
}

/// Remove every patch from both artifacts
pub fn clean(config: &PatchConfig, handler: &dyn OutputHandler) -> Result<i32> {
    let paths = locate_extension(config)?;

    handler.emit(stage(1, 2, "Cleaning webview script"));
    let script = read_artifact(&paths.script)?;
    let report = clean_script(&script)?;
    for item in &report.removed {
        handler.emit(OutputEvent::Removed {
            item: item.to_string(),
        });
    }
    if report.changed() {
        write_artifact(handler, &paths.script, &report.text)?;
    }
    let mut total = report.removed.len();

    handler.emit(stage(2, 2, "Cleaning webview stylesheet"));
    let stylesheet = read_artifact(&paths.stylesheet)?;
    let report = clean_stylesheet(&stylesheet);
    for item in &report.removed {
        handler.emit(OutputEvent::Removed {
            item: item.to_string(),
        });
    }
    if report.changed() {
        write_artifact(handler, &paths.stylesheet, &report.text)?;
    }
    total += report.removed.len();

    let summary = if total == 0 {
        "nothing to clean".to_string()
    } else {
        format!("removed {} patches", total)
    };
    handler.result(true, &summary);
    Ok(0)
}

/// Snapshot both artifacts into the backup slots
pub fn backup(config: &PatchConfig, handler: &dyn OutputHandler) -> Result<i32> {
    let paths = locate_extension(config)?;
    let store = BackupStore::new(config.backup_dir()?);

    for copied in store.backup(&paths)? {
        handler.emit(OutputEvent::Copied {
            slot: copied.slot.to_string(),
            path: copied.path,
            bytes: copied.bytes,
        });
    }

    handler.result(true, &format!("backup saved to {}", store.dir().display()));
    Ok(0)
}

/// Copy the backup slots back over the artifacts
pub fn restore(config: &PatchConfig, handler: &dyn OutputHandler) -> Result<i32> {
    let paths = locate_extension(config)?;
    let store = BackupStore::new(config.backup_dir()?);
    let result = store.restore(&paths)?;

    for copied in &result.restored {
        handler.emit(OutputEvent::Copied {
            slot: copied.slot.to_string(),
            path: copied.path.clone(),
            bytes: copied.bytes,
        });
    }
    for missing in &result.missing {
        handler.emit(OutputEvent::Warning {
            message: format!("backup not found at {}", missing.display()),
        });
    }

    let summary = if result.is_complete() {
        "restore complete".to_string()
    } else {
        format!("restore finished with {} missing backup(s)", result.missing.len())
    };
    handler.result(true, &summary);
    Ok(0)
}

fn stage(index: usize, total: usize, title: &str) -> OutputEvent {
    OutputEvent::Stage {
        index,
        total,
        title: title.to_string(),
    }
}

fn emit_anchors(handler: &dyn OutputHandler, anchors: &Anchors) {
    for anchor in anchors.iter() {
        handler.emit(OutputEvent::Anchor {
            kind: anchor.kind,
            value: anchor.value().map(str::to_string),
            fallback: anchor.is_fallback(),
        });
    }
}

fn emit_transforms(handler: &dyn OutputHandler, transforms: &[TransformReport]) {
    for t in transforms {
        handler.emit(OutputEvent::Transform {
            name: t.name.to_string(),
            outcome: t.outcome.clone(),
        });
    }
}

fn emit_checks(handler: &dyn OutputHandler, report: &VerifyReport) {
    for check in &report.checks {
        handler.emit(OutputEvent::Check {
            label: check.to_string(),
            passed: check.passed,
        });
    }
}

fn verify_files(paths: &ExtensionPaths) -> Result<VerifyReport> {
    let script = read_artifact(&paths.script)?;
    let stylesheet = read_artifact(&paths.stylesheet)?;
    Ok(verify(&script, &stylesheet))
}

fn read_artifact(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write_artifact(handler: &dyn OutputHandler, path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    handler.emit(OutputEvent::Written {
        path: path.to_path_buf(),
        bytes: text.len(),
    });
    Ok(())
}
