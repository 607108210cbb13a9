// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Two pieces of configuration drive an installer run. The [`RunConfig`] is
//! built once from command-line flags and never changes afterwards. The
//! [`Manifest`] describes the project being installed: where it lives, how
//! to recognize it, and what the host needs before it can run.
//!
//! # Manifest Layout
//!
//! The manifest is a TOML document. A default manifest for Fermentrack 2 is
//! embedded into the binary. Setting `FT2_INSTALLER_MANIFEST` to a file path
//! makes the installer load that file instead, which is mostly useful for
//! testing against forks or staging repositories.

use serde::{Deserialize, Serialize};
use std::{
    env,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

/// Environment variable naming an alternate manifest file.
pub const MANIFEST_ENV: &str = "FT2_INSTALLER_MANIFEST";

const DEFAULT_MANIFEST: &str = include_str!("manifest.toml");

/// Immutable configuration for one installer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Directory the project repository is cloned into.
    pub install_dir: PathBuf,

    /// Port the web interface is expected to listen on.
    pub port: u16,

    /// Enable the multi-tenant setting in the generated configuration.
    pub multi_tenant: bool,

    /// Build container images without starting them.
    pub no_start: bool,

    /// Never block on operator input.
    pub unattended: bool,

    /// Skip probing the target port.
    pub skip_port_check: bool,
}

impl RunConfig {
    /// Construct run configuration from manifest defaults.
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            install_dir: manifest.project.install_dir.clone(),
            port: manifest.port.default,
            multi_tenant: false,
            no_start: false,
            unattended: true,
            skip_port_check: false,
        }
    }

    /// Human readable name of the prompting mode.
    pub fn mode(&self) -> &'static str {
        if self.unattended {
            "unattended"
        } else {
            "interactive"
        }
    }
}

/// Project manifest layout.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Identity of the project being installed.
    pub project: ProjectSettings,

    /// Host compatibility settings.
    pub host: HostSettings,

    /// Port probing settings.
    pub port: PortSettings,

    /// JavaScript runtime settings.
    pub node: NodeSettings,

    /// Layout of the cloned repository.
    pub layout: LayoutSettings,

    /// Generated environment configuration.
    pub environment: EnvironmentSettings,

    /// System packages required before anything else can happen.
    #[serde(rename = "prerequisite")]
    pub prerequisites: Vec<Prerequisite>,
}

impl Manifest {
    /// Load manifest for current process.
    ///
    /// Reads the file named by [`MANIFEST_ENV`] when set, otherwise falls back
    /// to the embedded default manifest.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if manifest file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if manifest is malformed.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    pub fn load() -> Result<Self> {
        match env::var_os(MANIFEST_ENV) {
            Some(path) => Self::load_from(PathBuf::from(path)),
            None => Self::embedded(),
        }
    }

    /// Parse manifest embedded into the binary.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Deserialize`] if manifest is malformed.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    pub fn embedded() -> Result<Self> {
        DEFAULT_MANIFEST.parse()
    }

    /// Load manifest from target file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if manifest file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if manifest is malformed.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let data = read_to_string(path.as_ref()).map_err(|err| ConfigError::Read {
            source: err,
            path: path.as_ref().to_path_buf(),
        })?;
        data.parse()
    }

    /// Timeout to use when probing the target port.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.port.timeout_secs)
    }
}

impl FromStr for Manifest {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut manifest: Manifest = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on path fields.
        manifest.project.install_dir = expand_path(&manifest.project.install_dir)?;
        manifest.host.os_release = expand_path(&manifest.host.os_release)?;

        Ok(manifest)
    }
}

impl Display for Manifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Identity of the project being installed.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ProjectSettings {
    /// Display name of the project.
    pub name: String,

    /// Hosting slug of the repository, e.g., "owner/name".
    pub repository: String,

    /// URL to clone the repository from.
    pub clone_url: String,

    /// Substring every acceptable remote URL must contain.
    pub remote_pattern: String,

    /// Default install directory.
    pub install_dir: PathBuf,
}

/// Host compatibility settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct HostSettings {
    /// Path to system identification file.
    pub os_release: PathBuf,

    /// Package manager later phases depend on.
    pub package_manager: String,

    /// Distribution identifiers that are fully supported.
    pub supported: Vec<String>,

    /// Distribution identifiers that are known to work but untested.
    pub untested: Vec<String>,
}

/// Port probing settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PortSettings {
    /// Default port to probe and serve on.
    pub default: u16,

    /// Host name to probe.
    pub probe_host: String,

    /// Text identifying a response as coming from this project.
    pub marker: String,

    /// Connection timeout in seconds.
    pub timeout_secs: u64,
}

/// JavaScript runtime settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct NodeSettings {
    /// Lowest major version that is known to build the UI.
    pub minimum_major: u32,

    /// Vendor script that registers the package source.
    pub setup_script: String,
}

/// Layout of the cloned repository.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct LayoutSettings {
    /// Frontend directory relative to repository root.
    pub ui_dir: PathBuf,

    /// File proving that submodules were checked out.
    pub submodule_marker: PathBuf,

    /// Container compose definition relative to repository root.
    pub compose_file: PathBuf,

    /// Sample environment directory relative to repository root.
    pub sample_env_dir: PathBuf,

    /// Production environment directory relative to repository root.
    pub production_env_dir: PathBuf,
}

/// Generated environment configuration.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct EnvironmentSettings {
    /// Application settings file inside the environment directory.
    pub django_file: PathBuf,

    /// Database settings file inside the environment directory.
    pub postgres_file: PathBuf,

    /// Fixed database user name.
    pub database_user: String,
}

/// System package required by the installer.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Prerequisite {
    /// Package name known to the package manager.
    pub package: String,

    /// Command the package provides on the search path.
    pub command: String,
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read manifest file.
    #[error("failed to read manifest at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
