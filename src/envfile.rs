// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Environment file editing.
//!
//! The application reads its production settings from plain `KEY=value`
//! files, one assignment per line, with `#` starting a comment. Sample files
//! ship placeholders for secrets, sometimes commented out so the application
//! falls back to a default until the operator opts in.
//!
//! Edits are done line by line so comments, ordering, and unrelated
//! assignments survive untouched. A file is only rewritten when an edit
//! actually changed something.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

/// Manage assignments in a single environment file.
#[derive(Clone, Debug)]
pub struct EnvFileDrafter {
    path: PathBuf,
}

impl EnvFileDrafter {
    /// Construct new environment file drafter.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Edit assignments.
    ///
    /// Read current file content into [`EnvFileEdit`] instance, and directly
    /// edit it before writing the results back, if anything changed.
    ///
    /// # Errors
    ///
    /// - Return [`Error::ReadEnvFile`] if environment file cannot be read.
    /// - Return [`Error::WriteEnvFile`] if environment file cannot be written.
    pub fn edit<E>(&self, editor: E) -> Result<()>
    where
        E: FnOnce(&mut EnvFileEdit),
    {
        let content = read_to_string(&self.path).map_err(|err| Error::ReadEnvFile {
            source: err,
            path: self.path.clone(),
        })?;

        let mut edit = EnvFileEdit::from(content.as_str());
        editor(&mut edit);

        if !edit.changed {
            return Ok(());
        }

        write(&self.path, edit.to_string().as_bytes()).map_err(|err| Error::WriteEnvFile {
            source: err,
            path: self.path.clone(),
        })?;

        Ok(())
    }

    /// Lookup value of assignment.
    ///
    /// # Errors
    ///
    /// - Return [`Error::ReadEnvFile`] if environment file cannot be read.
    pub fn get(&self, key: impl AsRef<str>) -> Result<Option<String>> {
        read_to_string(&self.path)
            .map_err(|err| Error::ReadEnvFile {
                source: err,
                path: self.path.clone(),
            })
            .map(|content| EnvFileEdit::from(content.as_str()).get(key).map(str::to_owned))
    }
}

/// Environment file editor.
///
/// # Invariant
///
/// - Line order and unrelated lines are preserved.
/// - Setting a key never produces a second assignment of that key.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvFileEdit {
    lines: Vec<String>,
    trailing_newline: bool,
    changed: bool,
}

impl EnvFileEdit {
    /// Construct new empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup value of active assignment.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.lines
            .iter()
            .find_map(|line| assignment(line).filter(|(k, _)| *k == key.as_ref()))
            .map(|(_, value)| value)
    }

    /// Check for active assignment of key.
    pub fn contains(&self, key: impl AsRef<str>) -> bool {
        self.get(key).is_some()
    }

    /// Set key to value.
    ///
    /// Replaces the active assignment if there is one. Otherwise the first
    /// commented-out placeholder for the key is uncommented and replaced.
    /// Otherwise the assignment is appended.
    pub fn set(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) {
        let key = key.as_ref();
        let line = format!("{key}={}", value.as_ref());

        let position = self
            .lines
            .iter()
            .position(|l| assignment(l).is_some_and(|(k, _)| k == key))
            .or_else(|| {
                self.lines
                    .iter()
                    .position(|l| commented_assignment(l).is_some_and(|k| k == key))
            });

        match position {
            Some(index) if self.lines[index] == line => {}
            Some(index) => {
                self.lines[index] = line;
                self.changed = true;
            }
            None => self.append(line),
        }
    }

    /// Append assignment if key has no active assignment yet.
    pub fn set_if_missing(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) {
        if !self.contains(key.as_ref()) {
            self.append(format!("{}={}", key.as_ref(), value.as_ref()));
        }
    }

    fn append(&mut self, line: String) {
        self.lines.push(line);
        self.trailing_newline = true;
        self.changed = true;
    }
}

impl Display for EnvFileEdit {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mut out = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }

        write!(fmt, "{out}")
    }
}

impl From<&str> for EnvFileEdit {
    fn from(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_owned).collect(),
            trailing_newline: content.ends_with('\n'),
            changed: false,
        }
    }
}

fn assignment(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start();
    if line.starts_with('#') {
        return None;
    }

    let line = line.strip_prefix("export ").unwrap_or(line);
    line.split_once('=').map(|(key, value)| (key.trim(), value))
}

fn commented_assignment(line: &str) -> Option<&str> {
    let line = line.trim_start().strip_prefix('#')?.trim_start();
    let (key, _) = line.split_once('=')?;
    let key = key.trim();

    // INVARIANT: Only treat "# KEY=" as a placeholder, not prose with '='.
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    Some(key)
}

/// Environment file error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Environment file cannot be read from.
    #[error("failed to read environment file at {:?}", path.display())]
    ReadEnvFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Environment file cannot be written to.
    #[error("failed to write environment file at {:?}", path.display())]
    WriteEnvFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
