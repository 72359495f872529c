//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return typed errors (e.g. [`ConfigError`],
//! [`EnvironmentError`]) while command handlers at the CLI boundary convert
//! them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! DotstrapError
//! ├── Config(ConfigError)           - repository config, parameter document
//! ├── Environment(EnvironmentError) - privileged user, unsupported OS
//! ├── Link(LinkError)               - symlink and backup failures
//! ├── Render(RenderError)           - template materialization failures
//! └── Cancelled                     - the user interrupted the run
//! ```

use thiserror::Error;

pub use crate::resources::error::{LinkError, RenderError};

/// Top-level error type for the provisioning engine.
#[derive(Error, Debug)]
pub enum DotstrapError {
    /// Configuration-related error (repository config or parameter document).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The environment does not allow provisioning to start.
    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// A link could not be established.
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// A template could not be rendered.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The user cancelled the run (interrupt signal or prompt interrupt).
    #[error("cancelled by user")]
    Cancelled,
}

impl DotstrapError {
    /// Whether `err` is, or wraps, a user cancellation.
    #[must_use]
    pub fn is_cancellation(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<Self>(), Some(Self::Cancelled))
    }
}

/// Errors that arise from configuration and parameter loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The parameter document named on the command line does not exist.
    #[error("parameters file not found: {path}")]
    MissingParameters {
        /// Path that was given with `--parameters`.
        path: String,
    },

    /// The parameter document is not valid JSON or has the wrong shape.
    #[error("invalid parameters in {path}: {message}")]
    InvalidParameters {
        /// Path (or label) of the offending document.
        path: String,
        /// Human-readable description of the problem.
        message: String,
    },

    /// A TOML config file contains a syntax error.
    #[error("invalid TOML in {file}: {message}")]
    InvalidSyntax {
        /// Config file that failed to parse.
        file: String,
        /// Parser message.
        message: String,
    },

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Fatal environment problems detected before any mutation begins.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// The tool was started with root privileges.
    #[error("refusing to run as root; run as your regular user")]
    Privileged,

    /// The operating system is not the supported family.
    #[error("unsupported operating system: {os} (macOS required)")]
    UnsupportedOs {
        /// Detected operating system name.
        os: String,
    },

    /// The operating system release is older than the supported minimum.
    #[error("unsupported macOS version {found}: {minimum} or newer required")]
    UnsupportedVersion {
        /// Detected version string.
        found: String,
        /// Minimum supported major version.
        minimum: u32,
    },

    /// The home directory could not be determined.
    #[error("HOME environment variable is not set")]
    NoHome,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn missing_parameters_display() {
        let e = ConfigError::MissingParameters {
            path: "params.json".to_string(),
        };
        assert_eq!(e.to_string(), "parameters file not found: params.json");
    }

    #[test]
    fn invalid_parameters_display() {
        let e = ConfigError::InvalidParameters {
            path: "params.json".to_string(),
            message: "expected an object".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "invalid parameters in params.json: expected an object"
        );
    }

    #[test]
    fn io_error_has_source() {
        use std::error::Error as StdError;
        let e = ConfigError::Io {
            path: "conf/links.toml".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("conf/links.toml"));
    }

    #[test]
    fn unsupported_version_display() {
        let e = EnvironmentError::UnsupportedVersion {
            found: "11.7".to_string(),
            minimum: 12,
        };
        assert_eq!(
            e.to_string(),
            "unsupported macOS version 11.7: 12 or newer required"
        );
    }

    #[test]
    fn dotstrap_error_from_config_error() {
        let e: DotstrapError = ConfigError::MissingParameters {
            path: "p.json".to_string(),
        }
        .into();
        assert!(e.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn dotstrap_error_from_environment_error() {
        let e: DotstrapError = EnvironmentError::Privileged.into();
        assert!(e.to_string().contains("root"));
    }

    #[test]
    fn cancellation_is_recognised_through_context() {
        use anyhow::Context as _;
        let err = Err::<(), _>(DotstrapError::Cancelled)
            .context("installing Rectangle")
            .unwrap_err();
        assert!(DotstrapError::is_cancellation(&err));
        assert!(!DotstrapError::is_cancellation(&anyhow::anyhow!("curl failed")));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<DotstrapError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<EnvironmentError>();
    }

    #[test]
    fn errors_convert_to_anyhow() {
        let _config: anyhow::Error = ConfigError::MissingParameters {
            path: "x".to_string(),
        }
        .into();
        let _cancelled: anyhow::Error = DotstrapError::Cancelled.into();
    }
}
