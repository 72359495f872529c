//! User cancellation (Ctrl-C) tracking.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context as _, Result};

use crate::error::DotstrapError;

/// Shared flag raised when the user interrupts the run.
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`DotstrapError::Cancelled`] once the flag is raised.
    ///
    /// # Errors
    ///
    /// Returns [`DotstrapError::Cancelled`] if the user has interrupted.
    pub fn ensure_running(&self) -> Result<(), DotstrapError> {
        if self.is_cancelled() {
            Err(DotstrapError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Install a process-wide interrupt handler that raises this flag.
    ///
    /// Can only be called once per process.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler is already installed.
    pub fn install_handler(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || flag.cancel()).context("installing interrupt handler")
    }
}
