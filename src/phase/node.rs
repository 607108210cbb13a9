// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! JavaScript runtime installation.

use crate::{
    phase::{Context, Outcome, PhaseError, Result},
    probe::parse_major_version,
    runner::Invocation,
};

use tracing::{debug, instrument};

/// Install Node.js unless present, warning on outdated versions.
///
/// # Errors
///
/// - Return [`PhaseError::CommandWithHint`] if installation fails.
/// - Return [`PhaseError::ToolMissing`] if `node` or `npm` is still missing
///   after installation.
#[instrument(skip(ctx), level = "debug")]
pub fn run(ctx: &Context<'_>) -> Result<Outcome> {
    let minimum = ctx.manifest.node.minimum_major;

    if ctx.runner.exists("node") {
        let version = ctx.runner.check(&Invocation::new("node").arg("--version"))?;
        let version = version.trim();
        debug!("node reports {version:?}");

        return Ok(match parse_major_version(version) {
            Some(major) if major >= minimum => {
                Outcome::Success(format!("Node.js {version} is installed"))
            }
            Some(_) => Outcome::Warning(format!(
                "Node.js {version} is older than v{minimum}; the UI build may fail"
            )),
            None => Outcome::Warning(format!(
                "cannot determine Node.js version from {version:?}; v{minimum} or newer is required"
            )),
        });
    }

    let script = format!("curl -fsSL {} | bash -", ctx.manifest.node.setup_script);
    ctx.runner
        .check(&Invocation::shell(script).elevated())
        .map_err(PhaseError::hint("failed to add the Node.js package source"))?;
    ctx.runner
        .check(
            &Invocation::new(ctx.manifest.host.package_manager.as_str())
                .args(["install", "-y", "nodejs"])
                .elevated(),
        )
        .map_err(PhaseError::hint("failed to install Node.js"))?;

    for tool in ["node", "npm"] {
        if !ctx.runner.exists(tool) {
            return Err(PhaseError::ToolMissing {
                tool: tool.into(),
                hint: "see https://nodejs.org/en/download/package-manager".into(),
            });
        }
    }

    Ok(Outcome::Success("Installed Node.js LTS".into()))
}
