//! Locates the installed extension and its webview artifacts
//!
//! An explicit directory always wins and must exist. Otherwise each search
//! root is scanned in order and the newest install in the first root that
//! has one is used. Version suffixes sort lexicographically, which matches
//! how the marketplace names install directories.

use crate::config::PatchConfig;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("extension directory {path} does not exist")]
    OverrideMissing { path: PathBuf },

    #[error("no extension matching '{prefix}*' found in: {}", format_roots(.searched))]
    NotFound {
        prefix: String,
        searched: Vec<PathBuf>,
    },

    #[error("failed to scan {path}: {source}")]
    Scan { path: PathBuf, source: io::Error },
}

fn format_roots(roots: &[PathBuf]) -> String {
    roots
        .iter()
        .map(|root| root.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The two artifacts inside one extension install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionPaths {
    pub root: PathBuf,
    pub script: PathBuf,
    pub stylesheet: PathBuf,
}

impl ExtensionPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let webview = root.join("webview");
        Self {
            script: webview.join("index.js"),
            stylesheet: webview.join("index.css"),
            root,
        }
    }
}

/// Resolve the extension to patch from configuration
pub fn locate_extension(config: &PatchConfig) -> Result<ExtensionPaths, DiscoveryError> {
    if let Some(dir) = config.ext_dir() {
        if !dir.is_dir() {
            return Err(DiscoveryError::OverrideMissing { path: dir });
        }
        tracing::debug!(path = %dir.display(), "using configured extension directory");
        return Ok(ExtensionPaths::new(dir));
    }

    let prefix = config.extension_prefix();
    let roots = config.search_roots();
    for root in &roots {
        if let Some(found) = newest_install(root, prefix)? {
            tracing::info!(path = %found.display(), "found extension");
            return Ok(ExtensionPaths::new(found));
        }
    }

    Err(DiscoveryError::NotFound {
        prefix: prefix.to_string(),
        searched: roots,
    })
}

/// Greatest directory name under `root` that starts with `prefix`
fn newest_install(root: &Path, prefix: &str) -> Result<Option<PathBuf>, DiscoveryError> {
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "search root missing");
        return Ok(None);
    }

    let scan_err = |source| DiscoveryError::Scan {
        path: root.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(root).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) && entry.path().is_dir() {
            candidates.push(name);
        }
    }

    candidates.sort();
    Ok(candidates.pop().map(|name| root.join(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_with_roots(roots: &[&Path]) -> PatchConfig {
        PatchConfig {
            search_roots: roots.iter().map(|r| r.to_path_buf()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_override_wins() {
        let dir = TempDir::new().unwrap();
        let config = PatchConfig {
            ext_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let paths = locate_extension(&config).unwrap();
        assert_eq!(paths.root, dir.path());
        assert_eq!(paths.script, dir.path().join("webview/index.js"));
        assert_eq!(paths.stylesheet, dir.path().join("webview/index.css"));
    }

    #[test]
    fn test_override_must_exist() {
        let dir = TempDir::new().unwrap();
        let config = PatchConfig {
            ext_dir: Some(dir.path().join("gone")),
            ..Default::default()
        };
        assert!(matches!(
            locate_extension(&config),
            Err(DiscoveryError::OverrideMissing { .. })
        ));
    }

    #[test]
    fn test_picks_newest_install() {
        let root = TempDir::new().unwrap();
        for name in [
            "anthropic.claude-code-2.0.9",
            "anthropic.claude-code-2.1.3",
            "anthropic.claude-code-2.1.1",
            "ms-python.python-2025.1.0",
        ] {
            std::fs::create_dir(root.path().join(name)).unwrap();
        }
        // Files with the prefix are not installs
        std::fs::write(root.path().join("anthropic.claude-code-9.9.9"), "").unwrap();

        let paths = locate_extension(&config_with_roots(&[root.path()])).unwrap();
        assert_eq!(paths.root, root.path().join("anthropic.claude-code-2.1.3"));
    }

    #[test]
    fn test_first_root_with_match_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::create_dir(first.path().join("anthropic.claude-code-1.0.0")).unwrap();
        std::fs::create_dir(second.path().join("anthropic.claude-code-3.0.0")).unwrap();

        let paths = locate_extension(&config_with_roots(&[first.path(), second.path()])).unwrap();
        assert_eq!(paths.root, first.path().join("anthropic.claude-code-1.0.0"));
    }

    #[test]
    fn test_skips_missing_and_empty_roots() {
        let empty = TempDir::new().unwrap();
        let populated = TempDir::new().unwrap();
        std::fs::create_dir(populated.path().join("anthropic.claude-code-1.2.3")).unwrap();
        let missing = empty.path().join("nope");

        let config = config_with_roots(&[&missing, empty.path(), populated.path()]);
        let paths = locate_extension(&config).unwrap();
        assert_eq!(paths.root, populated.path().join("anthropic.claude-code-1.2.3"));
    }

    #[test]
    fn test_not_found_names_roots() {
        let root = TempDir::new().unwrap();
        let err = locate_extension(&config_with_roots(&[root.path()])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("anthropic.claude-code-*"));
        assert!(msg.contains(&root.path().display().to_string()));
    }
}
