// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository clone and update.
//!
//! The install directory is treated as a small state machine:
//!
//! - __Absent__: clone the project into it.
//! - __Not a working copy__: refuse, whatever is in there belongs to someone.
//! - __Working copy of another project__: refuse for the same reason.
//! - __Working copy of this project__: fetch and pull.
//!
//! Either way submodules are initialized afterwards, and the submodule marker
//! file must exist before the phase counts as done.
//!
//! # Submodule Fallback
//!
//! Submodules may be registered with SSH URLs. Headless hosts rarely have SSH
//! keys for the hosting service, but they do have HTTPS credentials through
//! the GitHub CLI credential helper. So if the first submodule update fails,
//! SSH URLs in `.gitmodules` are rewritten to HTTPS, synchronized, and the
//! update is retried exactly once.

use crate::{
    phase::{Context, Outcome, PhaseError, Result},
    probe::ssh_to_https,
    runner::{CommandError, Invocation},
};

use git2::{Config, ErrorCode, Repository};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

const SUBMODULE_URLS: &str = r"submodule\..*\.url";

/// Clone or update the project repository, including submodules.
///
/// # Errors
///
/// - Return [`PhaseError::NotAWorkingCopy`] if the install directory exists
///   but is not a git repository.
/// - Return [`PhaseError::RemoteMismatch`] if the install directory is a
///   repository of another project.
/// - Return [`PhaseError::CommandWithHint`] if clone, fetch, or pull fail.
/// - Return [`PhaseError::Submodules`] if submodules cannot be initialized.
/// - Return [`PhaseError::MissingMarker`] if the submodule marker is missing.
#[instrument(skip(ctx), level = "debug")]
pub fn run(ctx: &Context<'_>) -> Result<Outcome> {
    let dir = ctx.config.install_dir.as_path();

    let message = if dir.exists() {
        verify_working_copy(ctx, dir)?;
        update(ctx, dir)?;
        format!("Updated {}", dir.display())
    } else {
        clone(ctx, dir)?;
        format!("Cloned {} into {}", ctx.manifest.project.repository, dir.display())
    };

    init_submodules(ctx, dir)?;

    let marker = ctx.install_path(&ctx.manifest.layout.submodule_marker);
    if !marker.is_file() {
        return Err(PhaseError::MissingMarker { path: marker });
    }

    Ok(Outcome::Success(message))
}

/// Make sure existing directory is a working copy of this project.
///
/// # Errors
///
/// - Return [`PhaseError::NotAWorkingCopy`] if not a git repository.
/// - Return [`PhaseError::RemoteMismatch`] if origin points elsewhere.
pub fn verify_working_copy(ctx: &Context<'_>, dir: &Path) -> Result<()> {
    let repository = match Repository::open(dir) {
        Ok(repository) => repository,
        Err(err) if err.code() == ErrorCode::NotFound => {
            return Err(PhaseError::NotAWorkingCopy {
                path: dir.to_path_buf(),
            });
        }
        Err(err) => return Err(err.into()),
    };

    let remote = match repository.find_remote("origin") {
        Ok(remote) => remote.url().unwrap_or_default().to_string(),
        Err(err) if err.code() == ErrorCode::NotFound => String::new(),
        Err(err) => return Err(err.into()),
    };
    debug!("{} has origin {remote:?}", dir.display());

    let expected = &ctx.manifest.project.remote_pattern;
    if !remote.contains(expected.as_str()) {
        return Err(PhaseError::RemoteMismatch {
            path: dir.to_path_buf(),
            remote,
            expected: expected.clone(),
        });
    }

    Ok(())
}

fn clone(ctx: &Context<'_>, dir: &Path) -> Result<()> {
    if let Some(parent) = dir.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        mkdirp::mkdirp(parent).map_err(|err| PhaseError::Io {
            source: err,
            action: "create",
            path: parent.to_path_buf(),
        })?;
    }

    info!("clone {} into {}", ctx.manifest.project.clone_url, dir.display());
    ctx.runner
        .check(
            &Invocation::new("git")
                .arg("clone")
                .arg(&ctx.manifest.project.clone_url)
                .arg(dir.to_string_lossy()),
        )
        .map_err(PhaseError::hint(format!(
            "failed to clone {}; check GitHub CLI authentication and network access",
            ctx.manifest.project.clone_url
        )))?;

    Ok(())
}

fn update(ctx: &Context<'_>, dir: &Path) -> Result<()> {
    info!("update existing working copy at {}", dir.display());
    ctx.runner
        .check(&git(dir).arg("fetch"))
        .map_err(PhaseError::hint("failed to fetch latest changes"))?;
    ctx.runner.check(&git(dir).arg("pull")).map_err(PhaseError::hint(
        "failed to pull latest changes; resolve any local modifications and re-run",
    ))?;

    Ok(())
}

/// Initialize submodules, retrying once over HTTPS.
///
/// # Errors
///
/// - Return [`PhaseError::Submodules`] if the retry fails too.
/// - Return [`PhaseError::Git2`] if `.gitmodules` cannot be rewritten.
pub fn init_submodules(ctx: &Context<'_>, dir: &Path) -> Result<()> {
    let update = git(dir).args(["submodule", "update", "--init", "--recursive"]);
    let first = match ctx.runner.check(&update) {
        Ok(_) => return Ok(()),
        Err(err) => err,
    };
    warn!("submodule update failed, retrying over HTTPS: {first}");

    let rewritten = rewrite_submodule_urls(&dir.join(".gitmodules"))?;
    debug!("rewrote {rewritten} submodule URLs to HTTPS");

    let retry = ctx
        .runner
        .check(&git(dir).args(["submodule", "sync", "--recursive"]))
        .and_then(|_| ctx.runner.check(&update));

    retry.map(|_| ()).map_err(|source: CommandError| PhaseError::Submodules {
        source,
        path: dir.to_path_buf(),
    })
}

/// Rewrite SSH submodule URLs in target `.gitmodules` file to HTTPS.
///
/// Returns number of rewritten URLs.
///
/// # Errors
///
/// - Return [`PhaseError::Git2`] if the file cannot be read or written.
pub fn rewrite_submodule_urls(gitmodules: &Path) -> Result<usize> {
    if !gitmodules.is_file() {
        return Ok(0);
    }

    let mut config = Config::open(gitmodules)?;
    let mut rewrites: Vec<(String, String)> = Vec::new();
    {
        let mut entries = config.entries(Some(SUBMODULE_URLS))?;
        while let Some(entry) = entries.next() {
            let entry = entry?;
            let (Some(name), Some(url)) = (entry.name(), entry.value()) else {
                continue;
            };

            if let Some(https) = ssh_to_https(url) {
                rewrites.push((name.to_string(), https));
            }
        }
    }

    for (name, url) in &rewrites {
        debug!("set {name} = {url}");
        config.set_str(name, url)?;
    }

    Ok(rewrites.len())
}

fn git(dir: &Path) -> Invocation {
    Invocation::new("git").arg("-C").arg(dir.to_string_lossy())
}
