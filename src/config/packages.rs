//! Homebrew package lists.
use serde::Deserialize;
use std::path::Path;

use super::toml_loader;
use crate::error::ConfigError;

/// Contents of `conf/packages.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackagesConfig {
    /// Command-line formulae.
    #[serde(default)]
    pub formulae: Vec<String>,
    /// Casks.
    #[serde(default)]
    pub casks: Vec<String>,
}

impl PackagesConfig {
    /// Whether no package is configured at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.formulae.is_empty() && self.casks.is_empty()
    }
}

/// Load `packages.toml`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load(path: &Path) -> Result<PackagesConfig, ConfigError> {
    toml_loader::load_config(path)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn load_formulae_and_casks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packages.toml");
        std::fs::write(&path, "formulae = [\"git\", \"ripgrep\"]\ncasks = [\"iterm2\"]\n").unwrap();
        let packages = load(&path).unwrap();
        assert_eq!(packages.formulae, vec!["git", "ripgrep"]);
        assert_eq!(packages.casks, vec!["iterm2"]);
        assert!(!packages.is_empty());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("packages.toml")).unwrap().is_empty());
    }
}
