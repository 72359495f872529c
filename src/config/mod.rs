pub mod apps;
pub mod links;
pub mod packages;
pub mod parameters;
pub mod toml_loader;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub use crate::error::ConfigError;
pub use parameters::{ParameterDocument, StageFlag};

/// All repository configuration under `conf/`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Repository root the configuration was loaded from.
    pub root: PathBuf,
    /// Core and excluded link names from `links.toml`.
    pub links: links::LinksConfig,
    /// Homebrew formulae and casks from `packages.toml`.
    pub packages: packages::PackagesConfig,
    /// Applications from `apps.toml`.
    pub apps: Vec<apps::AppEntry>,
}

impl Config {
    /// Load all configuration from `<root>/conf`.
    ///
    /// # Errors
    ///
    /// Returns an error if any present config file is malformed.
    pub fn load(root: &Path) -> Result<Self> {
        let conf = root.join("conf");

        let links = links::load(&conf.join("links.toml")).context("loading links.toml")?;
        let packages =
            packages::load(&conf.join("packages.toml")).context("loading packages.toml")?;
        let apps = apps::load(&conf.join("apps.toml")).context("loading apps.toml")?;

        Ok(Self {
            root: root.to_path_buf(),
            links,
            packages,
            apps,
        })
    }

    /// Directory holding `template.<scope>` files.
    #[must_use]
    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("templates")
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn load_empty_repository() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.links.core().len(), links::DEFAULT_CORE.len());
        assert!(config.packages.is_empty());
        assert!(config.apps.is_empty());
        assert_eq!(config.templates_dir(), dir.path().join("templates"));
    }

    #[test]
    fn malformed_file_names_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("conf")).unwrap();
        std::fs::write(dir.path().join("conf/packages.toml"), "formulae = 1").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("packages.toml"));
    }
}
