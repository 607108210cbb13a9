// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! GitHub CLI setup and authentication.
//!
//! The project repository is private, so every git operation later on goes
//! through credentials stored by the GitHub CLI. This phase makes sure the
//! CLI exists, is logged in, and can actually read the repository.

use crate::{
    phase::{Context, Outcome, PhaseError, Result},
    runner::Invocation,
};

use tracing::{info, instrument};

const KEYRING: &str = "/usr/share/keyrings/githubcli-archive-keyring.gpg";
const KEYRING_URL: &str = "https://cli.github.com/packages/githubcli-archive-keyring.gpg";
const SOURCE_LIST: &str = "/etc/apt/sources.list.d/github-cli.list";

/// Install, authenticate, and validate the GitHub CLI.
///
/// # Errors
///
/// - Return [`PhaseError::AuthenticationRequired`] if not logged in while
///   running unattended.
/// - Return [`PhaseError::AuthenticationFailed`] if interactive login fails.
/// - Return [`PhaseError::RepositoryAccess`] if the project repository cannot
///   be read with the stored credentials.
/// - Return [`PhaseError::CommandWithHint`] if installation fails.
#[instrument(skip(ctx), level = "debug")]
pub fn run(ctx: &Context<'_>) -> Result<Outcome> {
    let mut notes = Vec::new();
    if !ctx.runner.exists("gh") {
        install(ctx)?;
        notes.push("installed GitHub CLI");
    }

    if !ctx.runner.succeeds(&Invocation::new("gh").args(["auth", "status"])) {
        if ctx.config.unattended {
            return Err(PhaseError::AuthenticationRequired);
        }

        info!("GitHub CLI not authenticated, starting login");
        if !ctx
            .runner
            .interactive(&Invocation::new("gh").args(["auth", "login"]))?
        {
            return Err(PhaseError::AuthenticationFailed);
        }
        notes.push("logged in");
    }

    ctx.runner
        .check(&Invocation::new("gh").args(["auth", "setup-git"]))
        .map_err(PhaseError::hint(
            "failed to configure git to use GitHub CLI credentials",
        ))?;

    let repository = &ctx.manifest.project.repository;
    if !ctx.runner.succeeds(
        &Invocation::new("gh")
            .args(["repo", "view"])
            .arg(repository)
            .args(["--json", "name"]),
    ) {
        return Err(PhaseError::RepositoryAccess {
            repository: repository.clone(),
        });
    }

    let mut message = format!("GitHub CLI can access {repository}");
    if !notes.is_empty() {
        message.push_str(&format!(" ({})", notes.join(", ")));
    }

    Ok(Outcome::Success(message))
}

fn install(ctx: &Context<'_>) -> Result<()> {
    let package_manager = ctx.manifest.host.package_manager.as_str();
    let script = format!(
        "curl -fsSL {KEYRING_URL} -o {KEYRING} && chmod go+r {KEYRING} && \
         echo \"deb [arch=$(dpkg --print-architecture) signed-by={KEYRING}] \
         https://cli.github.com/packages stable main\" > {SOURCE_LIST}"
    );

    ctx.runner
        .check(&Invocation::shell(script).elevated())
        .map_err(PhaseError::hint("failed to add the GitHub CLI package source"))?;
    ctx.runner
        .check(&Invocation::new(package_manager).arg("update").elevated())
        .map_err(PhaseError::hint("failed to refresh the package index"))?;
    ctx.runner
        .check(
            &Invocation::new(package_manager)
                .args(["install", "-y", "gh"])
                .elevated(),
        )
        .map_err(PhaseError::hint("failed to install the GitHub CLI"))?;

    if !ctx.runner.exists("gh") {
        return Err(PhaseError::ToolMissing {
            tool: "gh".into(),
            hint: "install it manually from https://cli.github.com".into(),
        });
    }

    Ok(())
}
