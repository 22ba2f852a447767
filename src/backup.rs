//! Single-generation backup slots for the two webview artifacts

use crate::discovery::ExtensionPaths;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SCRIPT_SLOT: &str = "webview-index.js.bak";
pub const STYLESHEET_SLOT: &str = "webview-index.css.bak";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("failed to create backup directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// One artifact copied into or out of a slot
#[derive(Debug, Clone, Serialize)]
pub struct CopiedFile {
    pub slot: &'static str,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Result of a restore operation
#[derive(Debug, Default, Serialize)]
pub struct RestoreResult {
    /// Artifacts that were overwritten from their slot
    pub restored: Vec<CopiedFile>,
    /// Slots with no backup file
    pub missing: Vec<PathBuf>,
}

impl RestoreResult {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slots<'a>(&self, paths: &'a ExtensionPaths) -> [(&'static str, &'a Path, PathBuf); 2] {
        [
            (SCRIPT_SLOT, paths.script.as_path(), self.dir.join(SCRIPT_SLOT)),
            (STYLESHEET_SLOT, paths.stylesheet.as_path(), self.dir.join(STYLESHEET_SLOT)),
        ]
    }

    /// Copy both artifacts into their slots, replacing any earlier backup
    pub fn backup(&self, paths: &ExtensionPaths) -> Result<Vec<CopiedFile>, BackupError> {
        fs::create_dir_all(&self.dir).map_err(|source| BackupError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let mut copied = Vec::new();
        for (slot, artifact, backup) in self.slots(paths) {
            let bytes = copy(artifact, &backup)?;
            tracing::debug!(slot, bytes, "backed up");
            copied.push(CopiedFile {
                slot,
                path: backup,
                bytes,
            });
        }
        Ok(copied)
    }

    /// Copy each existing slot back over its artifact
    pub fn restore(&self, paths: &ExtensionPaths) -> Result<RestoreResult, BackupError> {
        let mut result = RestoreResult::default();

        for (slot, artifact, backup) in self.slots(paths) {
            if !backup.is_file() {
                tracing::warn!(path = %backup.display(), "backup not found");
                result.missing.push(backup);
                continue;
            }
            let bytes = copy(&backup, artifact)?;
            result.restored.push(CopiedFile {
                slot,
                path: artifact.to_path_buf(),
                bytes,
            });
        }
        Ok(result)
    }
}

fn copy(from: &Path, to: &Path) -> Result<u64, BackupError> {
    fs::copy(from, to).map_err(|source| BackupError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn extension(dir: &Path) -> ExtensionPaths {
        let paths = ExtensionPaths::new(dir);
        fs::create_dir_all(paths.script.parent().unwrap()).unwrap();
        fs::write(&paths.script, "var a=1;").unwrap();
        fs::write(&paths.stylesheet, ".a{}").unwrap();
        paths
    }

    #[test]
    fn test_backup_then_restore() {
        let ext = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let paths = extension(ext.path());
        let store = BackupStore::new(store_dir.path().join("nested/backups"));

        let copied = store.backup(&paths).unwrap();
        assert_eq!(copied.len(), 2);
        assert_eq!(copied[0].bytes, 8);
        assert!(store.dir().join(SCRIPT_SLOT).is_file());

        fs::write(&paths.script, "patched").unwrap();
        fs::write(&paths.stylesheet, "patched").unwrap();

        let result = store.restore(&paths).unwrap();
        assert!(result.is_complete());
        assert_eq!(result.restored.len(), 2);
        assert_eq!(fs::read_to_string(&paths.script).unwrap(), "var a=1;");
        assert_eq!(fs::read_to_string(&paths.stylesheet).unwrap(), ".a{}");
    }

    #[test]
    fn test_backup_overwrites_previous() {
        let ext = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let paths = extension(ext.path());
        let store = BackupStore::new(store_dir.path());

        store.backup(&paths).unwrap();
        fs::write(&paths.script, "second").unwrap();
        store.backup(&paths).unwrap();

        let saved = fs::read_to_string(store_dir.path().join(SCRIPT_SLOT)).unwrap();
        assert_eq!(saved, "second");
    }

    #[test]
    fn test_restore_without_backup_warns() {
        let ext = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let paths = extension(ext.path());
        let store = BackupStore::new(store_dir.path());

        let result = store.restore(&paths).unwrap();
        assert!(!result.is_complete());
        assert!(result.restored.is_empty());
        assert_eq!(result.missing.len(), 2);
        assert_eq!(fs::read_to_string(&paths.script).unwrap(), "var a=1;");
    }

    #[test]
    fn test_restore_partial() {
        let ext = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let paths = extension(ext.path());
        fs::write(store_dir.path().join(STYLESHEET_SLOT), ".old{}").unwrap();

        let result = BackupStore::new(store_dir.path()).restore(&paths).unwrap();
        assert_eq!(result.restored.len(), 1);
        assert_eq!(result.restored[0].slot, STYLESHEET_SLOT);
        assert_eq!(result.missing, vec![store_dir.path().join(SCRIPT_SLOT)]);
        assert_eq!(fs::read_to_string(&paths.stylesheet).unwrap(), ".old{}");
    }

    #[test]
    fn test_backup_missing_artifact_errors() {
        let ext = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let paths = ExtensionPaths::new(ext.path());

        let err = BackupStore::new(store_dir.path()).backup(&paths).unwrap_err();
        assert!(matches!(err, BackupError::Copy { .. }));
    }
}
