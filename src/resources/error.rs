//! Typed error variants for resource operations.
//!
//! [`LinkError`] and [`RenderError`] are the failure modes of the linker and
//! the template materializer; [`ResourceError`] covers executor-driven
//! resources (packages, app bundles).  Callers convert to
//! [`anyhow::Error`] via `?`.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to establish a single link.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The link source does not exist; nothing was touched.
    #[error("source missing: {}", .path.display())]
    SourceMissing {
        /// Expected source path.
        path: PathBuf,
    },

    /// The existing destination could not be moved into the backup session.
    ///
    /// No link is created when this happens.
    #[error("could not back up {}: {source}", .path.display())]
    BackupFailed {
        /// Destination that was to be displaced.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The symlink itself could not be created.
    #[error("could not create link {}: {source}", .path.display())]
    LinkCreationFailed {
        /// Destination of the link.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Failure to render a single template.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The template file could not be read.
    #[error("cannot read template {}: {source}", .path.display())]
    TemplateRead {
        /// Template path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file name does not carry the template prefix.
    #[error("not a template file name: {}", .path.display())]
    NotATemplate {
        /// Offending path.
        path: PathBuf,
    },

    /// Strict mode: the parameter document has no entry for the scope.
    #[error("no parameters for scope '{scope}'")]
    MissingScope {
        /// Scope derived from the template name.
        scope: String,
    },

    /// Strict mode: one or more placeholders had no value.
    #[error("unresolved placeholders in scope '{scope}': {}", .tokens.join(", "))]
    Unresolved {
        /// Scope derived from the template name.
        scope: String,
        /// Tokens that stayed unresolved, braces included.
        tokens: Vec<String>,
    },

    /// The rendered output could not be written.
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        /// Output path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise from executor-driven resources.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A command invoked by a resource failed with a non-zero exit code.
    #[error("command '{program}' failed (exit {exit_code}): {stderr}")]
    ExecutionFailed {
        /// Name of the program that was invoked.
        program: String,
        /// Exit code returned by the process.
        exit_code: i32,
        /// Captured standard error output.
        stderr: String,
    },

    /// A required tool or artifact was not found.
    #[error("resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource.
        resource: String,
    },

    /// A downloaded artifact did not match its expected digest.
    #[error("checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Artifact name.
        name: String,
        /// Digest declared in configuration.
        expected: String,
        /// Digest of the downloaded bytes.
        actual: String,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn source_missing_display() {
        let e = LinkError::SourceMissing {
            path: PathBuf::from("/repo/.zshrc"),
        };
        assert_eq!(e.to_string(), "source missing: /repo/.zshrc");
    }

    #[test]
    fn backup_failed_mentions_path_and_cause() {
        let e = LinkError::BackupFailed {
            path: PathBuf::from("/home/u/.zshrc"),
            source: std::io::Error::other("read-only file system"),
        };
        assert!(e.to_string().contains("/home/u/.zshrc"));
        assert!(e.to_string().contains("read-only file system"));
    }

    #[test]
    fn unresolved_lists_tokens() {
        let e = RenderError::Unresolved {
            scope: "gitconfig".to_string(),
            tokens: vec!["{{GIT_USER_NAME}}".to_string(), "{{GIT_EMAIL}}".to_string()],
        };
        assert_eq!(
            e.to_string(),
            "unresolved placeholders in scope 'gitconfig': {{GIT_USER_NAME}}, {{GIT_EMAIL}}"
        );
    }

    #[test]
    fn checksum_mismatch_display() {
        let e = ResourceError::ChecksumMismatch {
            name: "iTerm".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert!(e.to_string().contains("expected aa, got bb"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn resource_errors_are_send_sync() {
        assert_send_sync::<LinkError>();
        assert_send_sync::<RenderError>();
        assert_send_sync::<ResourceError>();
    }
}
