//! Link configuration: the fixed core set and discovery exclusions.
use serde::Deserialize;
use std::path::Path;

use super::toml_loader;
use crate::error::ConfigError;

/// Core files linked on every run when `links.toml` does not list its own.
pub const DEFAULT_CORE: &[&str] = &[
    ".zshrc",
    ".zprofile",
    ".gitconfig",
    ".gitignore_global",
    ".vimrc",
    ".tmux.conf",
];

/// Contents of `conf/links.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinksConfig {
    /// Explicit core set; [`DEFAULT_CORE`] when absent.
    #[serde(default)]
    core: Option<Vec<String>>,
    /// Hidden names never offered by discovery.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl LinksConfig {
    /// Build a config with an explicit core set.
    #[must_use]
    pub fn with_core<S: Into<String>>(core: impl IntoIterator<Item = S>) -> Self {
        Self {
            core: Some(core.into_iter().map(Into::into).collect()),
            exclude: Vec::new(),
        }
    }

    /// Names in the core set, in configured order.
    #[must_use]
    pub fn core(&self) -> Vec<String> {
        self.core.clone().unwrap_or_else(|| {
            DEFAULT_CORE.iter().map(|s| (*s).to_string()).collect()
        })
    }
}

/// Load `links.toml`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load(path: &Path) -> Result<LinksConfig, ConfigError> {
    toml_loader::load_config(path)
}
