// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Provision Fermentrack 2 onto a Debian-based host.
//!
//! The installer is a single ordered __pipeline__ of __phases__. Each phase
//! inspects the current state of the host before acting, so running the
//! installer again on an already provisioned host only performs the work that
//! is still missing. The first fatal failure aborts the whole run.
//!
//! # Layout
//!
//! - [`cli`] turns the raw argument vector into an immutable [`RunConfig`].
//! - [`config`] holds the run configuration and the project [`Manifest`].
//! - [`runner`] and [`prompt`] are the two capabilities every phase is handed,
//!   so phases never touch the host directly.
//! - [`probe`] inspects the host: OS identity, listening ports, versions.
//! - [`phase`] contains the phases themselves.
//! - [`pipeline`] wires everything together and reports progress.

pub mod cli;
pub mod config;
pub mod envfile;
pub mod phase;
pub mod pipeline;
pub mod probe;
pub mod prompt;
pub mod runner;
pub mod secrets;
pub mod ui;

#[doc(inline)]
pub use crate::{
    cli::{parse_args, Parsed},
    config::{Manifest, RunConfig},
    phase::{Context, Outcome, PhaseError},
    pipeline::{Completion, Phase, Pipeline, PipelineError},
    prompt::{InquirePrompter, Prompter},
    runner::{CommandRunner, Invocation, SystemRunner},
};
