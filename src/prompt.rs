//! Yes/no confirmation, interactive or preset.
use inquire::InquireError;

use crate::error::DotstrapError;

/// Asks whether a step should run.
#[cfg_attr(test, mockall::automock)]
pub trait Confirm: Send + Sync + std::fmt::Debug {
    /// Return the answer to `question`; `default` is the suggested answer.
    ///
    /// # Errors
    ///
    /// Returns [`DotstrapError::Cancelled`] when the user interrupts the
    /// prompt.
    fn confirm(&self, question: &str, default: bool) -> Result<bool, DotstrapError>;
}

/// Answers every question with its default, without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct Preset;

impl Confirm for Preset {
    fn confirm(&self, _question: &str, default: bool) -> Result<bool, DotstrapError> {
        Ok(default)
    }
}

/// Prompts on the terminal.
///
/// When standard input is not a terminal the default answer is used.
#[derive(Debug, Default, Clone, Copy)]
pub struct Interactive;

impl Confirm for Interactive {
    fn confirm(&self, question: &str, default: bool) -> Result<bool, DotstrapError> {
        let answer = inquire::Confirm::new(question)
            .with_default(default)
            .prompt();
        map_answer(answer, default)
    }
}

/// Translate an inquire result into an answer.
///
/// Escape declines, Ctrl-C cancels the run, and a missing terminal falls
/// back to the default.
fn map_answer(answer: Result<bool, InquireError>, default: bool) -> Result<bool, DotstrapError> {
    match answer {
        Ok(yes) => Ok(yes),
        Err(InquireError::OperationCanceled) => Ok(false),
        Err(InquireError::OperationInterrupted) => Err(DotstrapError::Cancelled),
        Err(_) => Ok(default),
    }
}

/// Build the confirmation strategy for the `--interactive` flag.
#[must_use]
pub fn for_mode(interactive: bool) -> Box<dyn Confirm> {
    if interactive {
        Box::new(Interactive)
    } else {
        Box::new(Preset)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn preset_returns_default() {
        assert!(Preset.confirm("link?", true).unwrap());
        assert!(!Preset.confirm("link?", false).unwrap());
    }

    #[test]
    fn escape_declines() {
        assert!(!map_answer(Err(InquireError::OperationCanceled), true).unwrap());
    }

    #[test]
    fn interrupt_cancels() {
        let result = map_answer(Err(InquireError::OperationInterrupted), true);
        assert!(matches!(result, Err(DotstrapError::Cancelled)));
    }

    #[test]
    fn no_terminal_uses_default() {
        assert!(map_answer(Err(InquireError::NotTTY), true).unwrap());
        assert!(!map_answer(Err(InquireError::NotTTY), false).unwrap());
    }

    #[test]
    fn answer_passes_through() {
        assert!(!map_answer(Ok(false), true).unwrap());
    }
}
