// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Environment probing.
//!
//! Pure inspection of host facts. Nothing in here changes the host, and
//! nothing is cached: every phase probes fresh when it runs.

use crate::config::HostSettings;

use std::{
    error::Error as StdError,
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, instrument};

/// Distribution identity read from the system identification file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OsIdentity {
    /// Distribution identifier, e.g., "debian".
    pub id: String,

    /// Distributions this one derives from.
    pub id_like: Vec<String>,

    /// Human readable distribution name.
    pub pretty_name: String,
}

impl OsIdentity {
    /// Read OS identity from target os-release file.
    ///
    /// # Errors
    ///
    /// - Return [`ProbeError::MissingOsRelease`] if the file cannot be read.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_to_string(path.as_ref()).map_err(|err| ProbeError::MissingOsRelease {
            source: err,
            path: path.as_ref().to_path_buf(),
        })?;

        Ok(Self::parse(&content))
    }

    /// Parse os-release content.
    ///
    /// Unknown keys, comments, and malformed lines are ignored.
    pub fn parse(content: &str) -> Self {
        let mut identity = Self::default();
        for line in content.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');

            match key.trim() {
                "ID" => identity.id = value.to_lowercase(),
                "ID_LIKE" => {
                    identity.id_like = value.split_whitespace().map(str::to_lowercase).collect()
                }
                "PRETTY_NAME" => identity.pretty_name = value.to_string(),
                _ => continue,
            }
        }

        if identity.pretty_name.is_empty() {
            identity.pretty_name = identity.id.clone();
        }

        identity
    }

    /// Classify distribution against host settings.
    ///
    /// Distributions not listed anywhere, but deriving from a supported one,
    /// are treated as untested rather than unknown.
    pub fn classify(&self, host: &HostSettings) -> OsSupport {
        if host.supported.iter().any(|id| *id == self.id) {
            return OsSupport::Supported;
        }

        if host.untested.iter().any(|id| *id == self.id) {
            return OsSupport::Untested;
        }

        if self
            .id_like
            .iter()
            .any(|like| host.supported.iter().any(|id| id == like))
        {
            return OsSupport::Untested;
        }

        OsSupport::Unknown
    }
}

/// Support level of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsSupport {
    Supported,
    Untested,
    Unknown,
}

/// What is listening on the target port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortStatus {
    /// Connection refused, nothing is listening.
    Free,

    /// An earlier installation of this project answered.
    SameApplication,

    /// Some other HTTP server answered.
    Occupied,

    /// Could not tell, e.g., timeout or a non-HTTP listener.
    Indeterminate(String),
}

/// Probe target port over HTTP.
///
/// # Errors
///
/// - Return [`ProbeError::HttpClient`] if the HTTP client cannot be built.
#[instrument(level = "debug")]
pub async fn probe_port(host: &str, port: u16, marker: &str, timeout: Duration) -> Result<PortStatus> {
    let client = reqwest::Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(ProbeError::HttpClient)?;

    let url = format!("http://{host}:{port}/");
    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(err) if is_connection_refused(&err) => {
            debug!("connection to {url} refused");
            return Ok(PortStatus::Free);
        }
        Err(err) => {
            debug!("probe of {url} failed: {err:?}");
            let reason = if err.is_timeout() {
                "timed out".to_string()
            } else {
                format!("no HTTP response ({err})")
            };
            return Ok(PortStatus::Indeterminate(reason));
        }
    };

    let server = response
        .headers()
        .get(reqwest::header::SERVER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response.text().await.unwrap_or_default();
    debug!("{url} answered, server header {server:?}");

    if body.contains(marker) || server.contains(marker) {
        return Ok(PortStatus::SameApplication);
    }

    Ok(PortStatus::Occupied)
}

fn is_connection_refused(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = cause.source();
    }

    false
}

/// Extract major version from version string like "v20.11.1".
pub fn parse_major_version(version: &str) -> Option<u32> {
    version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
}

/// Rewrite SSH-style remote URL to its HTTPS equivalent.
///
/// Returns `None` if the URL is not SSH-style.
pub fn ssh_to_https(url: &str) -> Option<String> {
    let url = url.trim();

    if let Some(rest) = url.strip_prefix("ssh://") {
        let (authority, path) = rest.split_once('/')?;
        let host = authority.rsplit('@').next()?;
        // INVARIANT: Drop any SSH port, HTTPS uses its own.
        let host = host.split(':').next()?;
        return Some(format!("https://{host}/{path}"));
    }

    if url.contains("://") {
        return None;
    }

    let (authority, path) = url.split_once(':')?;
    if authority.contains('/') || path.is_empty() {
        return None;
    }
    let host = authority.rsplit('@').next()?;

    Some(format!("https://{host}/{path}"))
}

/// Environment probing error types.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// System identification file is missing.
    #[error("cannot read system identification file {:?}", path.display())]
    MissingOsRelease {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// HTTP client cannot be constructed.
    #[error("failed to build HTTP client for port probe")]
    HttpClient(#[source] reqwest::Error),
}

/// Friendly result alias :3
pub type Result<T, E = ProbeError> = std::result::Result<T, E>;
