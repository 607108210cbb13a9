// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Prerequisite system packages.

use crate::{
    config::Prerequisite,
    phase::{Context, Outcome, PhaseError, Result},
    runner::Invocation,
};

use tracing::{debug, instrument};

/// Install whichever prerequisite packages are missing, in one batch.
///
/// # Errors
///
/// - Return [`PhaseError::CommandWithHint`] if refreshing the package index or
///   installing the missing packages fails.
#[instrument(skip(ctx), level = "debug")]
pub fn run(ctx: &Context<'_>) -> Result<Outcome> {
    let missing = ctx
        .manifest
        .prerequisites
        .iter()
        .filter(|prerequisite| !is_installed(ctx, prerequisite))
        .map(|prerequisite| prerequisite.package.as_str())
        .collect::<Vec<_>>();

    if missing.is_empty() {
        return Ok(Outcome::Success(
            "All prerequisite packages are already installed".into(),
        ));
    }

    let package_manager = ctx.manifest.host.package_manager.as_str();
    ctx.runner
        .check(&Invocation::new(package_manager).arg("update").elevated())
        .map_err(PhaseError::hint("failed to refresh the package index"))?;
    ctx.runner
        .check(
            &Invocation::new(package_manager)
                .args(["install", "-y"])
                .args(missing.iter().copied())
                .elevated(),
        )
        .map_err(PhaseError::hint(format!(
            "failed to install {}",
            missing.join(", ")
        )))?;

    Ok(Outcome::Success(format!("Installed {}", missing.join(", "))))
}

fn is_installed(ctx: &Context<'_>, prerequisite: &Prerequisite) -> bool {
    let status = ctx.runner.output(
        &Invocation::new("dpkg-query")
            .args(["-W", "-f=${Status}"])
            .arg(&prerequisite.package),
    );

    // INVARIANT: Fall back to the search path when the package database has
    // nothing to say, e.g., tools installed outside the package manager.
    let installed = match status {
        Ok(output) if output.success => output.stdout.contains("install ok installed"),
        _ => false,
    } || ctx.runner.exists(&prerequisite.command);
    debug!("{} installed: {installed}", prerequisite.package);

    installed
}
