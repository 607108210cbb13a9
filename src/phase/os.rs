// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Operating system compatibility.

use crate::{
    phase::{Context, Outcome, PhaseError, Result},
    probe::{OsIdentity, OsSupport},
    prompt::confirm_or_continue,
    runner::Invocation,
};

use tracing::{debug, instrument};

const KERNEL: &str = "Linux";

/// Check that host runs a compatible distribution with a package manager.
///
/// # Errors
///
/// - Return [`PhaseError::Unsupported`] if the kernel is not Linux, or the
///   package manager is missing.
/// - Return [`PhaseError::Probe`] if the system identification file is absent.
/// - Return [`PhaseError::Declined`] if the operator refuses to continue on an
///   untested or unknown distribution.
#[instrument(skip(ctx), level = "debug")]
pub fn run(ctx: &Context<'_>) -> Result<Outcome> {
    let kernel = ctx.runner.check(&Invocation::new("uname").arg("-s"))?;
    let kernel = kernel.trim();
    debug!("kernel reports {kernel:?}");
    if kernel != KERNEL {
        return Err(PhaseError::Unsupported(format!(
            "this installer requires {KERNEL}, found {kernel:?}"
        )));
    }

    let identity = OsIdentity::read(&ctx.manifest.host.os_release)?;
    let support = identity.classify(&ctx.manifest.host);
    debug!("{identity:?} classified as {support:?}");

    let warning = match support {
        OsSupport::Supported => None,
        OsSupport::Untested => Some(format!(
            "{} is Debian-based but has not been tested with this installer",
            identity.pretty_name
        )),
        OsSupport::Unknown => Some(format!(
            "{} is not a recognized distribution; only Debian-based systems are supported",
            identity.pretty_name
        )),
    };

    if let Some(warning) = &warning {
        if !confirm_or_continue(ctx.prompter, ctx.config.unattended, warning)? {
            return Err(PhaseError::Declined(format!(
                "{} is not supported",
                identity.pretty_name
            )));
        }
    }

    let package_manager = &ctx.manifest.host.package_manager;
    if !ctx.runner.exists(package_manager) {
        return Err(PhaseError::Unsupported(format!(
            "{package_manager} is required but was not found"
        )));
    }

    Ok(match warning {
        None => Outcome::Success(format!("{} is supported", identity.pretty_name)),
        Some(warning) => Outcome::Warning(warning),
    })
}
