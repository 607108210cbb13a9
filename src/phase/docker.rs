// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Container engine setup.
//!
//! Installing Docker is the easy part. The services must later be managed by
//! the invoking user without `sudo`, which requires membership in the docker
//! group. Group membership only applies to new login sessions, so whenever it
//! changes, or has not taken effect yet, the run halts and asks the operator
//! to log out and back in before re-running.

use crate::{
    phase::{Context, Outcome, PhaseError, Result},
    runner::Invocation,
};

use tracing::{debug, instrument};

const BOOTSTRAP: &str = "curl -fsSL https://get.docker.com | sh";
const GROUP: &str = "docker";

/// Install Docker and make sure it is usable without elevation.
///
/// # Errors
///
/// - Return [`PhaseError::CommandWithHint`] if installation fails.
/// - Return [`PhaseError::ToolMissing`] if `docker` is still missing after
///   installation.
#[instrument(skip(ctx), level = "debug")]
pub fn run(ctx: &Context<'_>) -> Result<Outcome> {
    if !ctx.runner.exists("docker") {
        ctx.runner
            .check(&Invocation::shell(BOOTSTRAP).elevated())
            .map_err(PhaseError::hint("failed to install Docker"))?;

        if !ctx.runner.exists("docker") {
            return Err(PhaseError::ToolMissing {
                tool: "docker".into(),
                hint: "see https://docs.docker.com/engine/install/".into(),
            });
        }
    }

    let user = current_user(ctx)?;
    let in_group = ctx
        .runner
        .check(&Invocation::new("id").args(["-nG", user.as_str()]))?
        .split_whitespace()
        .any(|group| group == GROUP);
    let can_run = ctx.runner.succeeds(&Invocation::new("docker").arg("info"));
    debug!("user {user:?}: in docker group {in_group}, docker usable {can_run}");

    if !in_group {
        ctx.runner
            .check(
                &Invocation::new("usermod")
                    .args(["-aG", GROUP, user.as_str()])
                    .elevated(),
            )
            .map_err(PhaseError::hint(format!(
                "failed to add {user} to the {GROUP} group"
            )))?;

        return Ok(Outcome::Halt(format!(
            "Added {user} to the {GROUP} group. Log out and back in for this to take \
             effect, then re-run the installer."
        )));
    }

    if !can_run {
        return Ok(Outcome::Halt(format!(
            "{user} is in the {GROUP} group, but this session predates it. Log out and \
             back in, then re-run the installer."
        )));
    }

    Ok(Outcome::Success("Docker is installed and usable".into()))
}

fn current_user(ctx: &Context<'_>) -> Result<String> {
    let user = ctx.runner.check(&Invocation::new("id").arg("-un"))?;
    Ok(user.trim().to_string())
}
