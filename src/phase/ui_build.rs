// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Frontend build.

use crate::{
    phase::{Context, Outcome, PhaseError, Result},
    runner::Invocation,
};

use tracing::instrument;

const HINT: &str = "make sure Node.js and npm are installed correctly";

/// Install frontend dependencies and build the UI.
///
/// # Errors
///
/// - Return [`PhaseError::CommandWithHint`] if either npm step fails.
#[instrument(skip(ctx), level = "debug")]
pub fn run(ctx: &Context<'_>) -> Result<Outcome> {
    let ui_dir = ctx.install_path(&ctx.manifest.layout.ui_dir);

    ctx.runner
        .check(&Invocation::new("npm").arg("install").current_dir(&ui_dir))
        .map_err(PhaseError::hint(format!(
            "failed to install UI dependencies; {HINT}"
        )))?;
    ctx.runner
        .check(
            &Invocation::new("npm")
                .args(["run", "build"])
                .current_dir(&ui_dir),
        )
        .map_err(PhaseError::hint(format!("failed to build the UI; {HINT}")))?;

    Ok(Outcome::Success(format!("Built UI in {}", ui_dir.display())))
}
