//! TOML configuration file parsing.
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Load a TOML config file into `T`.
///
/// A missing file deserializes from empty TOML, so every config type
/// must tolerate absent fields (`#[serde(default)]`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = if path.exists() {
        std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?
    } else {
        String::new()
    };

    toml::from_str(&content).map_err(|e| ConfigError::InvalidSyntax {
        file: path.display().to_string(),
        message: e.message().to_string(),
    })
}
