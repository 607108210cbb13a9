// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Operator prompts.
//!
//! Several phases hit situations the installer cannot judge on its own, e.g.,
//! an untested distribution or a port answering with something unexpected.
//! All of them go through [`confirm_or_continue`]: in interactive mode the
//! operator decides, in unattended mode the run continues with a warning.

use inquire::{Confirm, InquireError};
use tracing::{info, instrument};

/// Capability to ask the operator a yes/no question.
pub trait Prompter {
    /// Ask operator to confirm message.
    ///
    /// # Errors
    ///
    /// - Return [`PromptError`] if the terminal cannot be prompted.
    fn confirm(&self, message: &str) -> Result<bool>;
}

/// Prompt through the current terminal.
#[derive(Debug, Default, Clone)]
pub struct InquirePrompter;

impl InquirePrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for InquirePrompter {
    fn confirm(&self, message: &str) -> Result<bool> {
        match Confirm::new(message).with_default(false).prompt() {
            Ok(answer) => Ok(answer),
            // INVARIANT: Escape and Ctrl-C both mean "no".
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
            Err(err) => Err(PromptError(err)),
        }
    }
}

/// Ask whether to continue past warning, or continue automatically.
///
/// Returns whether the run should go on. The warning itself is only shown as
/// part of the question; reporting it otherwise is up to the caller.
///
/// # Errors
///
/// - Return [`PromptError`] if the operator cannot be prompted.
#[instrument(skip(prompter), level = "debug")]
pub fn confirm_or_continue(prompter: &dyn Prompter, unattended: bool, warning: &str) -> Result<bool> {
    if unattended {
        info!("unattended, continue past: {warning}");
        return Ok(true);
    }

    prompter.confirm(&format!("{warning}. Continue anyway?"))
}

/// Terminal prompt failed.
#[derive(Debug, thiserror::Error)]
#[error("cannot prompt operator, re-run with --unattended")]
pub struct PromptError(#[source] pub InquireError);

/// Friendly result alias :3
pub type Result<T, E = PromptError> = std::result::Result<T, E>;
