// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Provisioning phases.
//!
//! A __phase__ is one self-contained provisioning step. Every phase first
//! inspects the current state of the host, then only does the work that is
//! still missing. Running a phase twice in a row must leave the host exactly
//! as running it once did.
//!
//! # Phase Results
//!
//! Phases never exit the process themselves. Each one returns an [`Outcome`]
//! when the run may go on, or a [`PhaseError`] when it must stop:
//!
//! - [`Outcome::Success`] means the phase is done.
//! - [`Outcome::Warning`] means the phase is done, but the operator should
//!   know about something, e.g., an outdated runtime.
//! - [`Outcome::Halt`] means the run must stop _successfully_ because the
//!   operator has to do something by hand before continuing, e.g., log out
//!   and back in after joining a group.
//! - [`PhaseError`] means the run failed.

pub mod containers;
pub mod docker;
pub mod environment;
pub mod github;
pub mod node;
pub mod os;
pub mod port;
pub mod prerequisites;
pub mod repository;
pub mod ui_build;

use crate::{
    config::{Manifest, RunConfig},
    prompt::Prompter,
    runner::CommandRunner,
};

use std::path::PathBuf;

/// Everything a phase is allowed to touch.
pub struct Context<'a> {
    pub config: &'a RunConfig,
    pub manifest: &'a Manifest,
    pub runner: &'a dyn CommandRunner,
    pub prompter: &'a dyn Prompter,
}

impl<'a> Context<'a> {
    /// Construct new phase context.
    pub fn new(
        config: &'a RunConfig,
        manifest: &'a Manifest,
        runner: &'a dyn CommandRunner,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            config,
            manifest,
            runner,
            prompter,
        }
    }

    /// Absolute path inside the install directory.
    pub fn install_path(&self, relative: impl AsRef<std::path::Path>) -> PathBuf {
        self.config.install_dir.join(relative)
    }
}

/// Non-fatal result of a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Phase finished.
    Success(String),

    /// Phase finished with something worth the operator's attention.
    Warning(String),

    /// Run must stop successfully until the operator acts.
    Halt(String),
}

/// Fatal phase error types.
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    /// Host cannot run the project.
    #[error("unsupported environment: {0}")]
    Unsupported(String),

    /// Operator chose to stop.
    #[error("installation aborted: {0}")]
    Declined(String),

    /// Required tool missing after installing it.
    #[error("{tool} is still not available after installation, {hint}")]
    ToolMissing { tool: String, hint: String },

    /// Target port belongs to something else.
    #[error(
        "port {port} is already in use by another web server; free the port, \
         choose another with --port, or skip this check with --no-port-check"
    )]
    PortConflict { port: u16 },

    /// Hosting CLI is not authenticated in unattended mode.
    #[error(
        "GitHub CLI is not authenticated and unattended mode cannot log in; \
         run `gh auth login` first, then re-run the installer"
    )]
    AuthenticationRequired,

    /// Interactive authentication did not succeed.
    #[error("GitHub CLI authentication failed; run `gh auth login` and try again")]
    AuthenticationFailed,

    /// Authenticated account cannot read the project repository.
    #[error(
        "cannot access repository {repository}; make sure the authenticated \
         GitHub account has been granted access"
    )]
    RepositoryAccess { repository: String },

    /// Install directory exists but is not a working copy.
    #[error(
        "{:?} exists but is not a git repository; move it away or choose another \
         directory with --install-dir",
        path.display()
    )]
    NotAWorkingCopy { path: PathBuf },

    /// Install directory holds an unrelated repository.
    #[error(
        "{:?} is a git repository for {remote:?}, not {expected:?}; refusing to touch it",
        path.display()
    )]
    RemoteMismatch {
        path: PathBuf,
        remote: String,
        expected: String,
    },

    /// Submodules could not be initialized, even over HTTPS.
    #[error("failed to initialize submodules in {:?}", path.display())]
    Submodules {
        #[source]
        source: crate::runner::CommandError,
        path: PathBuf,
    },

    /// Marker file is missing after an operation that should create it.
    #[error("expected {:?} to exist; submodules may not have been checked out", path.display())]
    MissingMarker { path: PathBuf },

    /// Sample configuration is missing from the repository.
    #[error("sample configuration {:?} not found in repository", path.display())]
    MissingSample { path: PathBuf },

    /// Filesystem operation fails.
    #[error("failed to {action} {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        action: &'static str,
        path: PathBuf,
    },

    /// External command fails.
    #[error(transparent)]
    Command(#[from] crate::runner::CommandError),

    /// External command fails, with advice for the operator.
    #[error("{hint}")]
    CommandWithHint {
        #[source]
        source: crate::runner::CommandError,
        hint: String,
    },

    /// Environment probing fails.
    #[error(transparent)]
    Probe(#[from] crate::probe::ProbeError),

    /// Operator cannot be prompted.
    #[error(transparent)]
    Prompt(#[from] crate::prompt::PromptError),

    /// Environment file manipulation fails.
    #[error(transparent)]
    EnvFile(#[from] crate::envfile::Error),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

impl PhaseError {
    /// Attach operator advice to a failed command.
    pub fn hint(hint: impl Into<String>) -> impl FnOnce(crate::runner::CommandError) -> Self {
        let hint = hint.into();
        move |source| Self::CommandWithHint { source, hint }
    }
}

/// Friendly result alias :3
pub type Result<T, E = PhaseError> = std::result::Result<T, E>;
