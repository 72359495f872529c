//! GUI applications installed by direct download.
use serde::Deserialize;
use std::path::Path;

use super::toml_loader;
use crate::error::ConfigError;

/// Archive format of an application download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppFormat {
    /// Disk image, attached and copied from.
    Dmg,
    /// Zip archive, extracted and copied from.
    Zip,
}

/// One application entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppEntry {
    /// Display name.
    pub name: String,
    /// Bundle directory name, e.g. `iTerm.app`.
    pub bundle: String,
    /// Download URL.
    pub url: String,
    /// Archive format.
    pub format: AppFormat,
    /// Expected SHA-256 of the download, lowercase hex.
    #[serde(default)]
    pub sha256: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AppsFile {
    #[serde(default)]
    apps: Vec<AppEntry>,
}

/// Load `apps.toml`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load(path: &Path) -> Result<Vec<AppEntry>, ConfigError> {
    let file: AppsFile = toml_loader::load_config(path)?;
    Ok(file.apps)
}
