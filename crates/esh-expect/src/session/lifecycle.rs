//! Session lifecycle management.
//!
//! This module decides how a session's process is brought down. Whatever
//! strategy is configured, every shutdown ends with SIGKILL to the whole
//! process group and a bounded wait for the reap, so jobs the shell started
//! in the background go down with it.

use std::time::Duration;

use esh_pty::{ExitStatus, PtySignal, PtyWriter, UnixPtyChild};
use tokio::io::AsyncWriteExt;

use crate::types::ControlChar;

/// Shutdown strategy for closing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownStrategy {
    /// Send the exit command and wait for the shell to leave on its own.
    Graceful,
    /// Send SIGTERM to the process group and wait.
    Terminate,
    /// Send SIGKILL to the process group immediately.
    Kill,
    /// Try graceful, then terminate, then kill.
    #[default]
    Escalating,
}

/// Configuration for session shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// The shutdown strategy to use.
    pub strategy: ShutdownStrategy,
    /// Timeout for graceful shutdown.
    pub graceful_timeout: Duration,
    /// Timeout for terminate signal.
    pub terminate_timeout: Duration,
    /// Exit command to send for graceful shutdown; Ctrl-D when unset.
    pub exit_command: Option<String>,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            strategy: ShutdownStrategy::Escalating,
            graceful_timeout: Duration::from_secs(2),
            terminate_timeout: Duration::from_secs(1),
            exit_command: Some("exit".to_string()),
        }
    }
}

impl ShutdownConfig {
    /// Create a new shutdown config with graceful strategy.
    #[must_use]
    pub fn graceful() -> Self {
        Self {
            strategy: ShutdownStrategy::Graceful,
            ..Default::default()
        }
    }

    /// Create a new shutdown config with kill strategy.
    #[must_use]
    pub fn kill() -> Self {
        Self {
            strategy: ShutdownStrategy::Kill,
            ..Default::default()
        }
    }

    /// Create a new shutdown config with custom exit command.
    #[must_use]
    pub fn with_exit_command(mut self, command: impl Into<String>) -> Self {
        self.exit_command = Some(command.into());
        self
    }

    /// Send Ctrl-D instead of an exit command.
    #[must_use]
    pub fn with_eof(mut self) -> Self {
        self.exit_command = None;
        self
    }

    /// Set the graceful timeout.
    #[must_use]
    pub const fn with_graceful_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_timeout = timeout;
        self
    }

    /// Set the terminate timeout.
    #[must_use]
    pub const fn with_terminate_timeout(mut self, timeout: Duration) -> Self {
        self.terminate_timeout = timeout;
        self
    }
}

/// Bring the process down according to `config`, then reclaim its group.
pub(crate) async fn shutdown(
    child: &mut UnixPtyChild,
    writer: Option<&mut PtyWriter>,
    config: &ShutdownConfig,
    line_ending: &str,
    reap_timeout: Duration,
) -> Option<ExitStatus> {
    let mut status = None;

    if matches!(config.strategy, ShutdownStrategy::Graceful | ShutdownStrategy::Escalating) {
        if let Some(writer) = writer {
            request_exit(writer, config, line_ending).await;
        }
        status = wait_for(child, config.graceful_timeout).await;
    }

    if status.is_none() && matches!(config.strategy, ShutdownStrategy::Terminate | ShutdownStrategy::Escalating) {
        tracing::debug!(pgid = child.pgid(), "sending SIGTERM to process group");
        if let Err(e) = child.signal_group(PtySignal::Terminate) {
            tracing::warn!(pgid = child.pgid(), error = %e, "SIGTERM failed");
        }
        status = wait_for(child, config.terminate_timeout).await;
    }

    let killed = force_kill(child, reap_timeout).await;
    status.or(killed)
}

/// SIGKILL the whole process group and wait, bounded, for the reap.
///
/// Never fails: a group that is already gone is the expected outcome.
pub(crate) async fn force_kill(child: &mut UnixPtyChild, reap_timeout: Duration) -> Option<ExitStatus> {
    if let Err(e) = child.kill() {
        tracing::warn!(pgid = child.pgid(), error = %e, "SIGKILL to process group failed");
    }

    let status = wait_for(child, reap_timeout).await;
    if status.is_none() {
        tracing::warn!(pid = child.pid(), timeout = ?reap_timeout, "process not reaped after SIGKILL");
    }
    status
}

async fn request_exit(writer: &mut PtyWriter, config: &ShutdownConfig, line_ending: &str) {
    let input = config.exit_command.as_ref().map_or_else(
        || vec![ControlChar::CtrlD.as_byte()],
        |command| format!("{command}{line_ending}").into_bytes(),
    );

    if let Err(e) = writer.write_all(&input).await {
        // Usually means the shell already left
        tracing::trace!(error = %e, "could not send exit request");
    }
}

async fn wait_for(child: &mut UnixPtyChild, timeout: Duration) -> Option<ExitStatus> {
    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            tracing::warn!(pid = child.pid(), error = %e, "waiting for process failed");
            None
        }
        Err(_) => None,
    }
}
