// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External command execution.
//!
//! Every phase reaches the host through a [`CommandRunner`]. The installer
//! itself never links against a package manager, container engine, or
//! version-control library for mutation; it drives their command-line tools
//! the same way an operator would. Keeping that behind a trait lets phases be
//! exercised against a scripted runner instead of a real system.

use crate::ui;

use std::{
    cell::Cell,
    ffi::OsStr,
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    process::{Command, Stdio},
};
use tracing::{debug, instrument};

/// A single external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    elevated: bool,
}

impl Invocation {
    /// Construct new invocation of target program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            elevated: false,
        }
    }

    /// Construct new invocation of a shell script through `sh -c`.
    ///
    /// Only used for vendor bootstrap pipelines that are piped into a shell.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a listing of arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run invocation inside target directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Run invocation with elevated privileges.
    pub fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated
    }
}

impl Display for Invocation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        if self.elevated {
            fmt.write_str("sudo ")?;
        }

        fmt.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(fmt, " {arg:?}")?;
            } else {
                write!(fmt, " {arg}")?;
            }
        }

        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Construct successful output with given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Construct failed output with given stderr.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Merge stdout and stderr into one message without trailing newlines.
    pub fn message(&self) -> String {
        let mut message = String::new();
        if !self.stdout.is_empty() {
            message.push_str(format!("stdout: {}", self.stdout).as_str());
        }

        if !self.stderr.is_empty() {
            if !message.is_empty() && !message.ends_with('\n') {
                message.push('\n');
            }
            message.push_str(format!("stderr: {}", self.stderr).as_str());
        }

        // INVARIANT: Chomp trailing newlines.
        message.trim_end_matches(['\r', '\n']).to_string()
    }
}

/// Capability to run external commands.
pub trait CommandRunner {
    /// Run command to completion, capturing its output.
    ///
    /// A non-zero exit status is not an error here; it is reported through
    /// [`CommandOutput::success`].
    ///
    /// # Errors
    ///
    /// - Return [`CommandError::Spawn`] if command cannot be started at all.
    fn output(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Run command attached to the current terminal.
    ///
    /// Returns whether the command exited successfully.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError::Spawn`] if command cannot be started at all.
    fn interactive(&self, invocation: &Invocation) -> Result<bool>;

    /// Check if program resolves on the search path.
    fn exists(&self, program: &str) -> bool;

    /// Run command and require it to succeed.
    ///
    /// Returns captured stdout on success.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError::Spawn`] if command cannot be started at all.
    /// - Return [`CommandError::Failed`] if command exits unsuccessfully.
    fn check(&self, invocation: &Invocation) -> Result<String> {
        let output = self.output(invocation)?;
        if !output.success {
            return Err(CommandError::Failed {
                command: invocation.to_string(),
                message: output.message(),
            });
        }

        Ok(output.stdout)
    }

    /// Check if command runs successfully, treating spawn failure as failure.
    fn succeeds(&self, invocation: &Invocation) -> bool {
        self.output(invocation)
            .map(|output| output.success)
            .unwrap_or(false)
    }
}

/// Run commands on the current host.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    is_root: bool,
    primed: Cell<bool>,
}

impl SystemRunner {
    /// Construct new system runner for the current process.
    pub fn new() -> Self {
        Self {
            is_root: nix::unistd::Uid::effective().is_root(),
            primed: Cell::new(false),
        }
    }

    fn needs_credentials(&self, invocation: &Invocation) -> bool {
        invocation.elevated && !self.is_root && !self.primed.get()
    }

    /// Ask for sudo credentials on the terminal before the first elevated
    /// captured command, so its password prompt is never drawn under a
    /// spinner.
    fn prime_credentials(&self, invocation: &Invocation) -> Result<()> {
        if !self.needs_credentials(invocation) {
            return Ok(());
        }

        let validate = Invocation::new("sudo").arg("-v");
        if !self.interactive(&validate)? {
            return Err(CommandError::Failed {
                command: validate.to_string(),
                message: format!("cannot obtain sudo credentials to run {invocation}"),
            });
        }
        self.primed.set(true);

        Ok(())
    }

    fn command(&self, invocation: &Invocation) -> Command {
        // INVARIANT: Only prefix sudo when we are not already root.
        let mut command = if invocation.elevated && !self.is_root {
            let mut command = Command::new("sudo");
            command.arg(&invocation.program);
            command
        } else {
            Command::new(&invocation.program)
        };
        command.args(invocation.args.iter().map(OsStr::new));

        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        command
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    #[instrument(skip(self), fields(command = %invocation), level = "debug")]
    fn output(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.prime_credentials(invocation)?;
        debug!("run {invocation}");
        let spinner = ui::spinner(invocation.to_string());
        let output = self
            .command(invocation)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| CommandError::Spawn {
                source: err,
                command: invocation.to_string(),
            });
        spinner.finish_and_clear();
        let output = output?;

        let output = CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(output.stdout.as_slice()).into_owned(),
            stderr: String::from_utf8_lossy(output.stderr.as_slice()).into_owned(),
        };
        debug!(success = output.success, "finished {invocation}");

        Ok(output)
    }

    #[instrument(skip(self), fields(command = %invocation), level = "debug")]
    fn interactive(&self, invocation: &Invocation) -> Result<bool> {
        debug!("run interactively {invocation}");
        let status = self
            .command(invocation)
            .spawn()
            .and_then(|mut child| child.wait())
            .map_err(|err| CommandError::Spawn {
                source: err,
                command: invocation.to_string(),
            })?;

        Ok(status.success())
    }

    fn exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// External command error types.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Command could not be started.
    #[error("failed to run {command:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
    },

    /// Command exited unsuccessfully.
    #[error("command {command:?} failed:\n{message}")]
    Failed { command: String, message: String },
}

/// Friendly result alias :3
pub type Result<T, E = CommandError> = std::result::Result<T, E>;

/// Scripted runner for exercising phases without touching the host.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    use std::{
        cell::RefCell,
        collections::{HashSet, VecDeque},
    };

    struct Rule {
        pattern: String,
        responses: VecDeque<CommandOutput>,
    }

    /// Runner that answers commands by pattern and records what was run.
    ///
    /// Rules are matched by substring against the rendered command line, the
    /// first matching rule wins. Each rule answers from a queue; the last
    /// queued response is repeated forever. Commands that match no rule
    /// succeed with empty output.
    #[derive(Default)]
    pub(crate) struct FakeRunner {
        rules: RefCell<Vec<Rule>>,
        programs: RefCell<HashSet<String>>,
        provides: Vec<(String, String)>,
        log: RefCell<Vec<Invocation>>,
    }

    impl FakeRunner {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Answer commands matching pattern with queued responses.
        pub(crate) fn on(
            self,
            pattern: impl Into<String>,
            responses: impl IntoIterator<Item = CommandOutput>,
        ) -> Self {
            self.rules.borrow_mut().push(Rule {
                pattern: pattern.into(),
                responses: responses.into_iter().collect(),
            });
            self
        }

        /// Mark program as present on the search path.
        pub(crate) fn with_program(self, program: impl Into<String>) -> Self {
            self.programs.borrow_mut().insert(program.into());
            self
        }

        /// Make program present once a command matching pattern succeeds.
        pub(crate) fn provides(
            mut self,
            pattern: impl Into<String>,
            program: impl Into<String>,
        ) -> Self {
            self.provides.push((pattern.into(), program.into()));
            self
        }

        /// Rendered command lines of every invocation so far.
        pub(crate) fn commands(&self) -> Vec<String> {
            self.log.borrow().iter().map(ToString::to_string).collect()
        }

        /// Invocations so far.
        pub(crate) fn invocations(&self) -> Vec<Invocation> {
            self.log.borrow().clone()
        }

        /// Count invocations whose command line contains pattern.
        pub(crate) fn count(&self, pattern: &str) -> usize {
            self.commands()
                .iter()
                .filter(|command| command.contains(pattern))
                .count()
        }

        fn answer(&self, invocation: &Invocation) -> CommandOutput {
            let line = invocation.to_string();
            self.log.borrow_mut().push(invocation.clone());

            let mut rules = self.rules.borrow_mut();
            let output = match rules.iter_mut().find(|rule| line.contains(&rule.pattern)) {
                Some(rule) if rule.responses.len() > 1 => {
                    rule.responses.pop_front().unwrap_or_default()
                }
                Some(rule) => rule.responses.front().cloned().unwrap_or_default(),
                None => CommandOutput::ok(""),
            };

            if output.success {
                for (pattern, program) in &self.provides {
                    if line.contains(pattern) {
                        self.programs.borrow_mut().insert(program.clone());
                    }
                }
            }

            output
        }
    }

    impl CommandRunner for FakeRunner {
        fn output(&self, invocation: &Invocation) -> Result<CommandOutput> {
            Ok(self.answer(invocation))
        }

        fn interactive(&self, invocation: &Invocation) -> Result<bool> {
            Ok(self.answer(invocation).success)
        }

        fn exists(&self, program: &str) -> bool {
            self.programs.borrow().contains(program)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{fake::FakeRunner, *};
    use pretty_assertions::assert_eq;

    #[test]
    fn invocation_display_renders_command_line() {
        let invocation = Invocation::new("apt-get")
            .args(["install", "-y", "git"])
            .elevated();
        assert_eq!(invocation.to_string(), "sudo apt-get install -y git");

        let invocation = Invocation::shell("curl -fsSL https://get.docker.com | sh");
        assert_eq!(
            invocation.to_string(),
            r#"sh -c "curl -fsSL https://get.docker.com | sh""#
        );
    }

    #[test]
    fn command_output_message_merges_streams() {
        let output = CommandOutput {
            success: false,
            stdout: "partial\n".into(),
            stderr: "fatal: nope\n".into(),
        };
        assert_eq!(output.message(), "stdout: partial\nstderr: fatal: nope");
    }

    #[test]
    fn check_reports_failed_command() {
        let runner = FakeRunner::new().on("git pull", [CommandOutput::failed("conflict")]);
        let result = runner.check(&Invocation::new("git").arg("pull"));
        match result {
            Err(CommandError::Failed { command, message }) => {
                assert_eq!(command, "git pull");
                assert_eq!(message, "stderr: conflict");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn fake_runner_replays_queued_responses() {
        let runner = FakeRunner::new().on(
            "submodule update",
            [CommandOutput::failed("ssh"), CommandOutput::ok("")],
        );
        let update = Invocation::new("git").args(["submodule", "update"]);
        assert!(!runner.succeeds(&update));
        assert!(runner.succeeds(&update));
        assert!(runner.succeeds(&update));
        assert_eq!(runner.count("submodule update"), 3);
    }

    #[test]
    fn fake_runner_provides_program_after_install() {
        let runner = FakeRunner::new().provides("get.docker.com", "docker");
        assert!(!runner.exists("docker"));
        runner
            .check(&Invocation::shell("curl -fsSL https://get.docker.com | sh"))
            .unwrap();
        assert!(runner.exists("docker"));
    }

    #[test]
    fn sudo_credentials_are_requested_once_before_elevated_commands() {
        let runner = SystemRunner {
            is_root: false,
            primed: Cell::new(false),
        };
        let update = Invocation::new("apt-get").arg("update").elevated();
        assert!(runner.needs_credentials(&update));
        assert!(!runner.needs_credentials(&Invocation::new("id").arg("-un")));

        runner.primed.set(true);
        assert!(!runner.needs_credentials(&update));
    }

    #[test]
    fn root_runs_elevated_commands_without_sudo() -> anyhow::Result<()> {
        let runner = SystemRunner {
            is_root: true,
            primed: Cell::new(false),
        };

        let output = runner.output(&Invocation::new("true").elevated())?;
        assert!(output.success);
        assert!(!runner.primed.get());

        Ok(())
    }
}
