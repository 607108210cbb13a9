// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Port availability.

use crate::{
    phase::{Context, Outcome, PhaseError, Result},
    probe::{probe_port, PortStatus},
    prompt::confirm_or_continue,
};

use tracing::instrument;

/// Make sure the target port is free, or already served by this project.
///
/// # Errors
///
/// - Return [`PhaseError::PortConflict`] if another web server owns the port.
/// - Return [`PhaseError::Declined`] if the operator stops on an ambiguous
///   port state.
#[instrument(skip(ctx), level = "debug")]
pub async fn run(ctx: &Context<'_>) -> Result<Outcome> {
    let port = ctx.config.port;
    if ctx.config.skip_port_check {
        return Ok(Outcome::Warning(format!(
            "Skipping availability check for port {port}"
        )));
    }

    let settings = &ctx.manifest.port;
    let status = probe_port(
        &settings.probe_host,
        port,
        &settings.marker,
        ctx.manifest.probe_timeout(),
    )
    .await?;

    match status {
        PortStatus::Free => Ok(Outcome::Success(format!("Port {port} is available"))),
        PortStatus::SameApplication => Ok(Outcome::Success(format!(
            "Port {port} is served by an existing {} installation, upgrading it",
            ctx.manifest.project.name
        ))),
        PortStatus::Occupied => Err(PhaseError::PortConflict { port }),
        PortStatus::Indeterminate(reason) => {
            let warning = format!("Cannot tell whether port {port} is free: {reason}");
            if !confirm_or_continue(ctx.prompter, ctx.config.unattended, &warning)? {
                return Err(PhaseError::Declined(format!("port {port} may be in use")));
            }

            Ok(Outcome::Warning(warning))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{phase::testing::Harness, prompt::fake::FakePrompter, runner::fake::FakeRunner};
    use pretty_assertions::assert_eq;
    use tokio::{io::AsyncWriteExt, net::TcpListener};

    fn harness(port: u16) -> Harness {
        let mut harness = Harness::new(FakeRunner::new());
        harness.manifest.port.probe_host = "127.0.0.1".into();
        harness.config.port = port;
        harness
    }

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    async fn garbage_listener() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let _ = socket.write_all(b"\x00\x01garbage\r\n").await;
            }
        });
        port
    }

    #[tokio::test]
    async fn closed_port_is_available() -> anyhow::Result<()> {
        let harness = harness(free_port());
        let outcome = run(&harness.context()).await?;
        assert!(matches!(outcome, Outcome::Success(_)));

        Ok(())
    }

    #[tokio::test]
    async fn own_marker_means_upgrade() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("Welcome to Fermentrack")
            .create_async()
            .await;
        let port = server.socket_address().port();

        let harness = harness(port);
        let outcome = run(&harness.context()).await?;
        match outcome {
            Outcome::Success(message) => assert!(message.contains("upgrading")),
            other => panic!("unexpected outcome: {other:?}"),
        }

        Ok(())
    }

    #[tokio::test]
    async fn foreign_server_is_a_conflict() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("It works!")
            .create_async()
            .await;
        let port = server.socket_address().port();

        let harness = harness(port);
        let result = run(&harness.context()).await;
        assert!(matches!(result, Err(PhaseError::PortConflict { port: p }) if p == port));
    }

    #[tokio::test]
    async fn ambiguous_port_continues_when_unattended() -> anyhow::Result<()> {
        let harness = harness(garbage_listener().await);
        let outcome = run(&harness.context()).await?;
        assert!(matches!(outcome, Outcome::Warning(_)));
        assert_eq!(harness.prompter.asked(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn ambiguous_port_asks_when_interactive() {
        let mut harness = harness(garbage_listener().await);
        harness.config.unattended = false;
        harness.prompter = FakePrompter::answering([false]);

        let result = run(&harness.context()).await;
        assert!(matches!(result, Err(PhaseError::Declined(_))));
        assert_eq!(harness.prompter.asked(), 1);
    }

    #[tokio::test]
    async fn check_can_be_skipped() -> anyhow::Result<()> {
        let mut harness = harness(1);
        harness.config.skip_port_check = true;

        let outcome = run(&harness.context()).await?;
        assert!(matches!(outcome, Outcome::Warning(_)));

        Ok(())
    }
}
