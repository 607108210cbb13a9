// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Container build and start.

use crate::{
    phase::{Context, Outcome, PhaseError, Result},
    runner::Invocation,
};

use tracing::instrument;

/// Compose invocation for the production stack.
pub fn compose(ctx: &Context<'_>) -> Invocation {
    Invocation::new("docker")
        .args(["compose", "-f"])
        .arg(ctx.manifest.layout.compose_file.to_string_lossy())
        .current_dir(&ctx.config.install_dir)
}

/// Build container images, then start services unless told not to.
///
/// # Errors
///
/// - Return [`PhaseError::CommandWithHint`] if build or start fails.
#[instrument(skip(ctx), level = "debug")]
pub fn run(ctx: &Context<'_>) -> Result<Outcome> {
    ctx.runner
        .check(&compose(ctx).arg("build"))
        .map_err(PhaseError::hint("failed to build container images"))?;

    if ctx.config.no_start {
        return Ok(Outcome::Success(
            "Built container images, not starting services".into(),
        ));
    }

    ctx.runner
        .check(&compose(ctx).args(["up", "-d"]))
        .map_err(PhaseError::hint("failed to start services"))?;

    Ok(Outcome::Success("Services are running".into()))
}
