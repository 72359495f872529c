//! What `dotstrap` puts on the machine.
//!
//! Links and templates report through their own types
//! ([`symlink::LinkOutcome`], [`template::Written`]). The executor-driven
//! installers share the small vocabulary below.
pub mod app;
pub mod backup;
pub mod error;
pub mod helpers;
pub mod package;
pub mod symlink;
pub mod template;

use anyhow::Result;

/// Whether an installable item is already on the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Not installed.
    Missing,
    /// Installed; nothing to do.
    Present,
}

/// What [`Resource::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceChange {
    /// Installed by this run.
    Installed,
    /// Already on the machine.
    AlreadyPresent,
}

/// An item an installer stage can inspect and put in place.
pub trait Resource {
    /// Name used in log lines.
    fn description(&self) -> String;

    /// Inspect the machine.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined.
    fn current_state(&self) -> Result<ResourceState>;

    /// Install the item unless [`Resource::current_state`] says it is
    /// present.
    ///
    /// # Errors
    ///
    /// Returns an error if an external command, a download or a file system
    /// operation fails, or [`crate::error::DotstrapError::Cancelled`] when
    /// the user interrupts part way.
    fn apply(&self) -> Result<ResourceChange>;
}
