// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Command-line argument parsing.
//!
//! Turns the raw argument vector into an immutable [`RunConfig`]. Defaults not
//! given on the command line come from the [`Manifest`].

use crate::config::{Manifest, RunConfig};

use clap::{error::ErrorKind, value_parser, ArgAction, CommandFactory, FromArgMatches, Parser};
use std::{
    env::VarError,
    ffi::OsString,
    path::{absolute, PathBuf},
};
use tracing::debug;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "ft2-installer",
    about = "Provision Fermentrack 2 onto a Debian-based host",
    override_usage = "ft2-installer [options]",
    disable_help_flag = true
)]
struct Cli {
    /// Directory to install into.
    #[arg(long, value_name = "path")]
    install_dir: Option<String>,

    /// Port the web interface listens on.
    #[arg(long, value_name = "port", value_parser = value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Enable multi-tenant mode.
    #[arg(long)]
    multi_tenant: bool,

    /// Build containers without starting them.
    #[arg(long)]
    no_start: bool,

    /// Skip checking whether the port is available.
    #[arg(long)]
    no_port_check: bool,

    /// Ask before continuing past warnings.
    #[arg(long, overrides_with = "unattended")]
    interactive: bool,

    /// Continue past warnings without asking (default).
    #[arg(long, overrides_with = "interactive")]
    unattended: bool,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

/// Result of parsing the argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// Run the installer with this configuration.
    Run(RunConfig),

    /// Print this usage text and exit successfully.
    Help(String),
}

/// Parse argument vector into run configuration.
///
/// The first item is the program name.
///
/// # Errors
///
/// - Return [`ArgsError::Usage`] for unknown flags, missing values, or
///   invalid values.
/// - Return [`ArgsError::InstallDir`] if the install directory cannot be
///   expanded.
/// - Return [`ArgsError::Absolute`] if the install directory cannot be made
///   absolute.
pub fn parse_args<I, T>(args: I, manifest: &Manifest) -> Result<Parsed>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = command(manifest);
    let cli = match command
        .try_get_matches_from_mut(args)
        .and_then(|matches| Cli::from_arg_matches(&matches))
    {
        Ok(cli) => cli,
        Err(error) if error.kind() == ErrorKind::DisplayHelp => {
            return Ok(Parsed::Help(error.render().to_string()));
        }
        Err(error) => return Err(ArgsError::Usage(error.render().to_string())),
    };
    debug!("parsed {cli:?}");

    let mut config = RunConfig::from_manifest(manifest);
    if let Some(dir) = cli.install_dir {
        config.install_dir = install_dir(&dir)?;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    config.multi_tenant = cli.multi_tenant;
    config.no_start = cli.no_start;
    config.skip_port_check = cli.no_port_check;
    config.unattended = !cli.interactive;

    Ok(Parsed::Run(config))
}

/// Command definition showing manifest defaults in help.
fn command(manifest: &Manifest) -> clap::Command {
    let install_dir = manifest.project.install_dir.display().to_string();
    let port = manifest.port.default.to_string();

    Cli::command()
        .mut_arg("install_dir", |arg| {
            arg.help(format!("Directory to install into [default: {install_dir}]"))
        })
        .mut_arg("port", |arg| {
            arg.help(format!("Port the web interface listens on [default: {port}]"))
        })
}

fn install_dir(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).map_err(|err| ArgsError::InstallDir {
        source: err,
        path: raw.into(),
    })?;

    absolute(&*expanded).map_err(|err| ArgsError::Absolute {
        source: err,
        path: raw.into(),
    })
}

/// Argument parsing error types.
#[derive(Debug, thiserror::Error)]
pub enum ArgsError {
    #[error("{0}")]
    Usage(String),

    #[error("failed to expand install directory {path:?}")]
    InstallDir {
        #[source]
        source: shellexpand::LookupError<VarError>,
        path: String,
    },

    #[error("failed to resolve install directory {path:?}")]
    Absolute {
        #[source]
        source: std::io::Error,
        path: String,
    },
}

/// Friendly result alias :3
type Result<T, E = ArgsError> = std::result::Result<T, E>;
