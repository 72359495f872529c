//! Command: print version information.
use std::io::{self, Write as _};

/// Version string stamped by the build, or the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("DOTSTRAP_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the version to stdout.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn run() -> io::Result<()> {
    writeln!(io::stdout().lock(), "dotstrap {}", version())
}
