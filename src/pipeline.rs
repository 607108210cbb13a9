// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Provisioning pipeline.
//!
//! Runs every [`Phase`] in order, reporting each outcome as it goes. The first
//! [`PhaseError`] aborts the run. An [`Outcome::Halt`] stops the run early, but
//! successfully.

use crate::{
    phase::{
        containers, docker, environment, github, node, os, port, prerequisites, repository,
        ui_build, Context, Outcome, PhaseError,
    },
    ui,
};

use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{info, instrument};

/// Provisioning phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    OperatingSystem,
    Port,
    Prerequisites,
    GitHub,
    Docker,
    Node,
    Repository,
    Environment,
    UiBuild,
    Containers,
}

impl Phase {
    pub const ALL: [Phase; 10] = [
        Phase::OperatingSystem,
        Phase::Port,
        Phase::Prerequisites,
        Phase::GitHub,
        Phase::Docker,
        Phase::Node,
        Phase::Repository,
        Phase::Environment,
        Phase::UiBuild,
        Phase::Containers,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Phase::OperatingSystem => "Checking operating system",
            Phase::Port => "Checking port availability",
            Phase::Prerequisites => "Installing prerequisites",
            Phase::GitHub => "Setting up GitHub CLI",
            Phase::Docker => "Setting up Docker",
            Phase::Node => "Setting up Node.js",
            Phase::Repository => "Fetching repository",
            Phase::Environment => "Configuring environment",
            Phase::UiBuild => "Building UI",
            Phase::Containers => "Building and starting containers",
        }
    }

    async fn run(&self, ctx: &Context<'_>) -> Result<Outcome, PhaseError> {
        match self {
            Phase::OperatingSystem => os::run(ctx),
            Phase::Port => port::run(ctx).await,
            Phase::Prerequisites => prerequisites::run(ctx),
            Phase::GitHub => github::run(ctx),
            Phase::Docker => docker::run(ctx),
            Phase::Node => node::run(ctx),
            Phase::Repository => repository::run(ctx),
            Phase::Environment => environment::run(ctx),
            Phase::UiBuild => ui_build::run(ctx),
            Phase::Containers => containers::run(ctx),
        }
    }
}

impl Display for Phase {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.title())
    }
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Every phase ran.
    Finished,

    /// A phase stopped the run until the operator acts.
    Halted { phase: Phase, instruction: String },
}

/// Phase that aborted the run, and why.
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed: {source}")]
pub struct PipelineError {
    pub phase: Phase,
    #[source]
    pub source: PhaseError,
}

/// Ordered provisioning pipeline.
pub struct Pipeline<'a> {
    ctx: Context<'a>,
    phases: Vec<Phase>,
}

impl<'a> Pipeline<'a> {
    /// Construct pipeline running every phase.
    pub fn new(ctx: Context<'a>) -> Self {
        Self {
            ctx,
            phases: Phase::ALL.to_vec(),
        }
    }

    /// Run phases in order.
    ///
    /// # Errors
    ///
    /// - Return [`PipelineError`] for the first phase that fails.
    #[instrument(skip(self), level = "debug")]
    pub async fn run(&self) -> Result<Completion, PipelineError> {
        self.print_banner();

        let total = self.phases.len();
        for (index, phase) in self.phases.iter().copied().enumerate() {
            ui::print_header(index + 1, total, phase.title());
            info!("start phase: {phase}");

            let outcome = phase
                .run(&self.ctx)
                .await
                .map_err(|source| PipelineError { phase, source })?;

            match outcome {
                Outcome::Success(message) => ui::print_success(&message),
                Outcome::Warning(message) => ui::print_warning(&message),
                Outcome::Halt(instruction) => {
                    ui::print_next_step(&instruction);
                    return Ok(Completion::Halted { phase, instruction });
                }
            }
        }

        self.print_summary();
        Ok(Completion::Finished)
    }

    fn print_banner(&self) {
        let config = self.ctx.config;
        ui::print_banner(&format!("{} installer", self.ctx.manifest.project.name));
        ui::log_detail("install directory", &config.install_dir.display().to_string());
        ui::log_detail("port", &config.port.to_string());
        ui::log_detail("mode", config.mode());
        ui::log_detail("multi-tenant", &config.multi_tenant.to_string());
        ui::log_detail("start services", &(!config.no_start).to_string());
        ui::log_detail("port check", &(!config.skip_port_check).to_string());
    }

    fn print_summary(&self) {
        let config = self.ctx.config;
        let compose = containers::compose(&self.ctx);
        ui::print_banner("Installation complete");

        if config.no_start {
            ui::print_info("Services were built but not started. Start them with:");
            ui::print_next_step(&format!(
                "cd {} && {} up -d",
                config.install_dir.display(),
                compose
            ));
            return;
        }

        let url = match config.port {
            80 => "http://localhost".to_string(),
            port => format!("http://localhost:{port}"),
        };
        ui::print_success(&format!(
            "{} is available at {url}",
            self.ctx.manifest.project.name
        ));
        ui::print_info("Manage services from the install directory:");
        ui::log_detail("status", &format!("{compose} ps"));
        ui::log_detail("logs", &format!("{compose} logs -f"));
        ui::log_detail("stop", &format!("{compose} down"));
        ui::log_detail("update", "re-run this installer");
    }
}
