//! The user-supplied JSON parameter document.
//!
//! Top-level booleans are stage flags; top-level objects are scopes mapping
//! camelCase property names to scalar values. Scalars are kept as strings
//! since they are only ever substituted into templates.
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigError;

/// Boolean flags in the parameter document that gate optional stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageFlag {
    /// Install Homebrew formulae and casks.
    InstallPackages,
    /// Install GUI applications by download.
    InstallApps,
    /// Link discovered hidden files without asking.
    LinkDiscovered,
    /// Fail template rendering on unresolved placeholders.
    StrictTemplates,
}

impl StageFlag {
    /// Key of this flag in the document.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::InstallPackages => "installPackages",
            Self::InstallApps => "installApps",
            Self::LinkDiscovered => "linkDiscovered",
            Self::StrictTemplates => "strictTemplates",
        }
    }
}

/// Parsed parameter document. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterDocument {
    flags: BTreeMap<String, bool>,
    scopes: BTreeMap<String, BTreeMap<String, String>>,
}

impl ParameterDocument {
    /// A document with no flags and no scopes.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read and parse the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingParameters`] if the file does not exist,
    /// [`ConfigError::Io`] if it cannot be read and
    /// [`ConfigError::InvalidParameters`] if it is not a valid document.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingParameters {
                path: path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&path.display().to_string(), &text)
    }

    /// Parse a document from JSON text. `label` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameters`] on malformed JSON or when
    /// a value has a shape other than a boolean flag or a scope of scalars.
    pub fn from_json(label: &str, text: &str) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidParameters {
            path: label.to_string(),
            message,
        };

        let root: Value = serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
        let Value::Object(entries) = root else {
            return Err(invalid("top level must be an object".to_string()));
        };

        let mut doc = Self::default();
        for (key, value) in entries {
            match value {
                Value::Bool(b) => {
                    doc.flags.insert(key, b);
                }
                Value::Object(props) => {
                    let scope = scope_properties(&key, props).map_err(invalid)?;
                    doc.scopes.insert(key, scope);
                }
                other => {
                    return Err(invalid(format!(
                        "'{key}' must be a boolean flag or an object, found {}",
                        kind(&other)
                    )));
                }
            }
        }
        Ok(doc)
    }

    /// Value of a stage flag, if the document sets it.
    #[must_use]
    pub fn flag(&self, flag: StageFlag) -> Option<bool> {
        self.flags.get(flag.key()).copied()
    }

    /// Number of scopes.
    #[must_use]
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Whether the document has a scope named `scope`.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains_key(scope)
    }

    /// Properties of `scope`.
    #[must_use]
    pub fn scope(&self, scope: &str) -> Option<&BTreeMap<String, String>> {
        self.scopes.get(scope)
    }

    /// Look up `scope.property`.
    #[must_use]
    pub fn lookup(&self, scope: &str, property: &str) -> Option<&str> {
        self.scopes
            .get(scope)
            .and_then(|props| props.get(property))
            .map(String::as_str)
    }
}

fn scope_properties(
    scope: &str,
    props: Map<String, Value>,
) -> Result<BTreeMap<String, String>, String> {
    let mut out = BTreeMap::new();
    for (name, value) in props {
        let text = match value {
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Null => continue,
            other => {
                return Err(format!(
                    "'{scope}.{name}' must be a scalar, found {}",
                    kind(&other)
                ));
            }
        };
        out.insert(name, text);
    }
    Ok(out)
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "installPackages": true,
        "installApps": false,
        "git": { "userName": "Ada", "userEmail": "ada@example.com", "signCommits": true },
        "zsh": { "historySize": 5000, "theme": null }
    }"#;

    #[test]
    fn flags_and_scopes_are_separated() {
        let doc = ParameterDocument::from_json("sample", SAMPLE).unwrap();
        assert_eq!(doc.flag(StageFlag::InstallPackages), Some(true));
        assert_eq!(doc.flag(StageFlag::InstallApps), Some(false));
        assert_eq!(doc.flag(StageFlag::LinkDiscovered), None);
        assert!(doc.has_scope("git"));
        assert!(!doc.has_scope("installPackages"));
    }

    #[test]
    fn scalars_become_strings() {
        let doc = ParameterDocument::from_json("sample", SAMPLE).unwrap();
        assert_eq!(doc.lookup("git", "userName"), Some("Ada"));
        assert_eq!(doc.lookup("git", "signCommits"), Some("true"));
        assert_eq!(doc.lookup("zsh", "historySize"), Some("5000"));
    }

    #[test]
    fn null_property_is_absent() {
        let doc = ParameterDocument::from_json("sample", SAMPLE).unwrap();
        assert_eq!(doc.lookup("zsh", "theme"), None);
    }

    #[test]
    fn top_level_string_is_rejected() {
        let err = ParameterDocument::from_json("doc", r#"{"name": "x"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameters { .. }));
        assert!(err.to_string().contains("'name'"));
    }

    #[test]
    fn nested_object_in_scope_is_rejected() {
        let err = ParameterDocument::from_json("doc", r#"{"git": {"user": {"name": "x"}}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("git.user"));
    }

    #[test]
    fn non_object_root_is_rejected() {
        assert!(ParameterDocument::from_json("doc", "[1, 2]").is_err());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(ParameterDocument::from_json("doc", "{").is_err());
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ParameterDocument::load(&dir.path().join("params.json")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameters { .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let doc = ParameterDocument::load(&path).unwrap();
        assert_eq!(doc.scope("git").map(BTreeMap::len), Some(3));
    }
}
