//! Configuration loading with multi-layer merge

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that pins the extension directory
pub const EXT_DIR_ENV: &str = "CC_EXT_DIR";

pub const DEFAULT_EXTENSION_PREFIX: &str = "anthropic.claude-code-";

const DEFAULT_SEARCH_ROOTS: [&str; 2] = ["~/.vscode-server/extensions", "~/.vscode/extensions"];

/// Top-level cc-metrics configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PatchConfig {
    /// Extension directory to patch; skips discovery when set
    pub ext_dir: Option<PathBuf>,

    /// Where backup slots live
    pub backup_dir: Option<PathBuf>,

    /// File holding the base64 avatar payload
    pub avatar_path: Option<PathBuf>,

    /// Directories scanned for installed extensions, in priority order
    #[serde(default)]
    pub search_roots: Vec<PathBuf>,

    /// Directory name prefix of the extension
    pub extension_prefix: Option<String>,
}

/// Command-line values, applied last
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub ext_dir: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub avatar_path: Option<PathBuf>,
}

impl PatchConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. `explicit` if given, else ~/.config/cc-metrics/config.toml
    /// 3. `CC_EXT_DIR`
    /// 4. Command-line overrides
    pub fn load(explicit: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut config = Self::default();

        match explicit {
            Some(path) => config.merge(Self::load_file(path)?),
            None => {
                if let Some(user_path) = Self::user_config_path() {
                    if user_path.exists() {
                        let user = Self::load_file(&user_path)
                            .with_context(|| format!("loading {}", user_path.display()))?;
                        config.merge(user);
                    }
                }
            }
        }

        config.apply_env(|key| std::env::var(key).ok());
        config.apply_overrides(overrides);
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Get the user config path (~/.config/cc-metrics/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cc-metrics/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.ext_dir.is_some() {
            self.ext_dir = other.ext_dir;
        }
        if other.backup_dir.is_some() {
            self.backup_dir = other.backup_dir;
        }
        if other.avatar_path.is_some() {
            self.avatar_path = other.avatar_path;
        }
        if !other.search_roots.is_empty() {
            self.search_roots = other.search_roots;
        }
        if other.extension_prefix.is_some() {
            self.extension_prefix = other.extension_prefix;
        }
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(EXT_DIR_ENV).filter(|v| !v.is_empty()) {
            self.ext_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        self.merge(Self {
            ext_dir: overrides.ext_dir,
            backup_dir: overrides.backup_dir,
            avatar_path: overrides.avatar_path,
            ..Default::default()
        });
    }

    pub fn ext_dir(&self) -> Option<PathBuf> {
        self.ext_dir.as_deref().map(expand)
    }

    pub fn avatar_path(&self) -> Option<PathBuf> {
        self.avatar_path.as_deref().map(expand)
    }

    pub fn extension_prefix(&self) -> &str {
        self.extension_prefix
            .as_deref()
            .unwrap_or(DEFAULT_EXTENSION_PREFIX)
    }

    /// Configured search roots, or the VS Code defaults
    pub fn search_roots(&self) -> Vec<PathBuf> {
        if self.search_roots.is_empty() {
            DEFAULT_SEARCH_ROOTS
                .iter()
                .map(|root| expand(Path::new(root)))
                .collect()
        } else {
            self.search_roots.iter().map(|root| expand(root)).collect()
        }
    }

    /// Configured backup directory, or one under the local data directory
    pub fn backup_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.backup_dir {
            return Ok(expand(dir));
        }
        let data = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;
        Ok(data.join("cc-metrics").join("backups"))
    }
}

/// Expand a leading `~` in a path
fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = PatchConfig::default();
        assert_eq!(config.ext_dir(), None);
        assert_eq!(config.extension_prefix(), DEFAULT_EXTENSION_PREFIX);
        let roots = config.search_roots();
        assert_eq!(roots.len(), 2);
        assert!(roots[0].ends_with(".vscode-server/extensions"));
        assert!(roots[1].ends_with(".vscode/extensions"));
        assert!(!roots[0].starts_with("~"));
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
            backup_dir = "/var/backups/cc"
            avatar_path = "~/avatar.b64"
            search_roots = ["/opt/ext"]
            extension_prefix = "anthropic.claude-code-2"
        "#
        )
        .unwrap();

        let config = PatchConfig::load_file(&config_path).unwrap();
        assert_eq!(config.backup_dir().unwrap(), PathBuf::from("/var/backups/cc"));
        assert_eq!(config.search_roots(), vec![PathBuf::from("/opt/ext")]);
        assert_eq!(config.extension_prefix(), "anthropic.claude-code-2");
        assert!(!config.avatar_path().unwrap().starts_with("~"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "ext_directory = \"/x\"\n").unwrap();

        assert!(PatchConfig::load_file(&config_path).is_err());
    }

    #[test]
    fn test_layering() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "ext_dir = \"/from/file\"\nbackup_dir = \"/file/backups\"\n",
        )
        .unwrap();

        let mut config = PatchConfig::load_file(&config_path).unwrap();
        config.apply_env(|key| (key == EXT_DIR_ENV).then(|| "/from/env".to_string()));
        assert_eq!(config.ext_dir(), Some(PathBuf::from("/from/env")));

        config.apply_overrides(Overrides {
            ext_dir: Some("/from/flag".into()),
            ..Default::default()
        });
        assert_eq!(config.ext_dir(), Some(PathBuf::from("/from/flag")));
        // Untouched layers survive
        assert_eq!(config.backup_dir().unwrap(), PathBuf::from("/file/backups"));
    }

    #[test]
    fn test_empty_env_ignored() {
        let mut config = PatchConfig {
            ext_dir: Some("/from/file".into()),
            ..Default::default()
        };
        config.apply_env(|_| Some(String::new()));
        assert_eq!(config.ext_dir(), Some(PathBuf::from("/from/file")));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = PatchConfig::load(Some(&dir.path().join("missing.toml")), Overrides::default());
        assert!(result.is_err());
    }
}
