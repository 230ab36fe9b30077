//! Session handle for interacting with a spawned shell.
//!
//! This module provides the `Session` type: it owns the process, the write
//! half of its terminal and the output buffer fed by the drain task, and it
//! guarantees that the process group is killed when the session goes away.

use std::fs::File;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use esh_pty::{ExitStatus, PtyWriter, UnixPtyChild};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::drain::{LogSink, SharedBuffer, lock, spawn_drain};
use super::lifecycle;
use crate::config::SessionConfig;
use crate::error::{ExpectError, Result, SpawnError};
use crate::expect::{Matcher, OutputBuffer, Pattern, PatternSet};
use crate::types::{ControlChar, Match, SessionState};
use crate::util::Deadline;

/// A session handle for interacting with a spawned process.
///
/// A session owns exactly one child. Once [`Session::close`] has run, every
/// send and expect fails with [`ExpectError::SessionClosed`]. Dropping a
/// session that was never closed kills the child's whole process group.
pub struct Session {
    child: UnixPtyChild,
    writer: Option<PtyWriter>,
    buffer: SharedBuffer,
    updates: watch::Receiver<u64>,
    drain: Option<JoinHandle<()>>,
    config: SessionConfig,
    state: SessionState,
}

impl Session {
    /// Spawn the configured command on a new PTY.
    ///
    /// Raw output is mirrored to the destinations named in
    /// `config.logging`.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Spawn`] if the command cannot be found or
    /// started, or the PTY cannot be allocated, and an I/O error if the log
    /// file cannot be created.
    pub async fn spawn(config: SessionConfig) -> Result<Self> {
        Self::spawn_with_sink(config, LogSink::new()).await
    }

    /// Spawn with additional log destinations.
    ///
    /// # Errors
    ///
    /// See [`Session::spawn`].
    pub async fn spawn_with_sink(config: SessionConfig, mut sink: LogSink) -> Result<Self> {
        if config.command.is_empty() {
            return Err(ExpectError::config("no command to spawn"));
        }

        if let Some(ref path) = config.logging.log_file {
            let file = File::create(path)
                .map_err(|e| ExpectError::io_context(format!("creating session log {}", path.display()), e))?;
            sink.push(file);
        }
        if config.logging.log_user {
            sink.push(std::io::stdout());
        }

        let pty_config = config.pty_config();
        let (master, child) = esh_pty::spawn(&config.command, &config.args, &pty_config)
            .await
            .map_err(|e| SpawnError::from_pty(&config.command, e))?;
        let (reader, writer) = master.into_split();

        let pid = child.pid();
        let buffer: SharedBuffer = Arc::new(Mutex::new(OutputBuffer::new()));
        let (tx, updates) = watch::channel(0);
        let drain = spawn_drain(reader, Arc::clone(&buffer), sink, tx, pid);

        tracing::debug!(pid, command = %config.command, args = ?config.args, "session spawned");

        Ok(Self {
            child,
            writer: Some(writer),
            buffer,
            updates,
            drain: Some(drain),
            config,
            state: SessionState::Running,
        })
    }

    /// Get the child process ID (also its process group ID).
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.child.pid()
    }

    /// Get the current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Get the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the default expect timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.config.timeout.default
    }

    /// Set the default expect timeout.
    pub const fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout.default = timeout;
    }

    /// Check if the child process is still running.
    pub fn is_alive(&mut self) -> bool {
        if self.state.is_closed() {
            return false;
        }
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                self.state = SessionState::Exited(status);
                false
            }
            Err(_) => false,
        }
    }

    /// Get a copy of the unconsumed output.
    #[must_use]
    pub fn buffer(&self) -> String {
        lock(&self.buffer).to_string_lossy()
    }

    /// Send bytes to the process.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::SessionClosed`] after close and
    /// [`ExpectError::Write`] if the process has exited or the terminal no
    /// longer accepts input.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_usable()?;
        self.ensure_accepting_input()?;
        let writer = self.writer.as_mut().ok_or(ExpectError::SessionClosed)?;

        writer.write_all(data).await.map_err(ExpectError::Write)?;
        writer.flush().await.map_err(ExpectError::Write)?;

        tracing::trace!(pid = self.child.pid(), bytes = data.len(), "sent input");
        Ok(())
    }

    /// Send a string to the process.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub async fn send_str(&mut self, s: &str) -> Result<()> {
        self.send(s.as_bytes()).await
    }

    /// Send a line to the process (appends the configured line ending).
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let data = format!("{line}{}", self.config.line_ending.as_str());
        self.send(data.as_bytes()).await
    }

    /// Send a control character to the process.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub async fn send_control(&mut self, ctrl: ControlChar) -> Result<()> {
        self.send(&[ctrl.as_byte()]).await
    }

    /// Wait for one of `patterns` using the session's default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Timeout`] if nothing matched in time (the
    /// buffer is kept for later calls), [`ExpectError::ProcessExited`] if
    /// the process closed its output first and
    /// [`ExpectError::SessionClosed`] after close.
    pub async fn expect(&mut self, patterns: impl Into<PatternSet>) -> Result<Match> {
        let timeout = self.config.timeout.default;
        self.expect_timeout(patterns, timeout).await
    }

    /// Wait for one of `patterns`, giving up after `timeout`.
    ///
    /// Every alternative is tested against the whole unconsumed output. The
    /// match that starts earliest wins, ties going to the lower index. The
    /// matched text and everything before it is consumed.
    ///
    /// # Errors
    ///
    /// See [`Session::expect`].
    pub async fn expect_timeout(&mut self, patterns: impl Into<PatternSet>, timeout: Duration) -> Result<Match> {
        let patterns = patterns.into();
        if patterns.is_empty() {
            return Err(ExpectError::invalid_pattern("expect needs at least one pattern"));
        }

        let matcher = Matcher::new(&patterns);
        tracing::trace!(pid = self.child.pid(), patterns = patterns.len(), ?timeout, "expecting");

        let found = self
            .wait_until(timeout, &patterns.describe(), |buffer| matcher.try_match(buffer))
            .await?;

        tracing::trace!(pid = self.child.pid(), index = found.pattern_index, consumed = ?found.consumed, "matched");
        Ok(found)
    }

    /// Wait for an exact literal.
    ///
    /// # Errors
    ///
    /// See [`Session::expect`].
    pub async fn expect_exact(&mut self, text: &str) -> Result<Match> {
        self.expect(Pattern::literal(text)).await
    }

    /// Wait for a regular expression.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Regex`] if `pattern` does not compile, and
    /// otherwise as [`Session::expect`].
    pub async fn expect_regex(&mut self, pattern: &str) -> Result<Match> {
        self.expect(Pattern::regex(pattern)?).await
    }

    /// Wait for the process to close its output.
    ///
    /// Returns everything that was still unconsumed.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectError::Timeout`] if the output is still open when the
    /// default timeout elapses.
    pub async fn expect_eof(&mut self) -> Result<String> {
        let timeout = self.config.timeout.default;
        self.wait_until(timeout, "<EOF>", |buffer| {
            buffer
                .is_eof()
                .then(|| String::from_utf8_lossy(&buffer.consume_all()).into_owned())
        })
        .await
    }

    /// Repeatedly run `step` over the buffer until it yields a value.
    ///
    /// The buffer is rescanned after every append by the drain task; in
    /// between, the call sleeps on "new output" and "deadline" at once.
    async fn wait_until<T>(
        &mut self,
        timeout: Duration,
        waiting_for: &str,
        mut step: impl FnMut(&mut OutputBuffer) -> Option<T>,
    ) -> Result<T> {
        self.ensure_usable()?;
        let deadline = Deadline::from_now(timeout);

        loop {
            // Mark the current generation seen before scanning, so an
            // append racing with the scan still wakes the wait below.
            self.updates.borrow_and_update();

            let exited = {
                let mut buffer = lock(&self.buffer);
                if let Some(value) = step(&mut buffer) {
                    return Ok(value);
                }
                if buffer.is_eof() {
                    Some(buffer.to_string_lossy())
                } else if deadline.is_expired() {
                    return Err(ExpectError::timeout(timeout, waiting_for, buffer.to_string_lossy()));
                } else {
                    None
                }
            };

            if let Some(remaining) = exited {
                let status = self.child.try_wait().ok().flatten();
                if let Some(status) = status {
                    self.state = SessionState::Exited(status);
                }
                return Err(ExpectError::process_exited(status, waiting_for, remaining));
            }

            tokio::select! {
                changed = self.updates.changed() => {
                    if changed.is_err() {
                        // The drain task is gone; nothing more will arrive.
                        lock(&self.buffer).mark_eof();
                    }
                }
                () = deadline.sleep() => {}
            }
        }
    }

    /// Wait for the process to exit and return its status.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.wait().await?;
        if !self.state.is_closed() {
            self.state = SessionState::Exited(status);
        }
        Ok(status)
    }

    /// Close the session.
    ///
    /// With `force` the process group is killed at once. Without it the
    /// configured [`ShutdownConfig`](super::ShutdownConfig) runs first
    /// (exit command, SIGTERM), and the group is killed afterwards anyway.
    /// Closing an already-closed session does nothing.
    ///
    /// # Errors
    ///
    /// Cleanup problems are logged rather than returned; the `Result`
    /// leaves room for callers that treat close as fallible.
    pub async fn close(&mut self, force: bool) -> Result<()> {
        if self.state.is_closed() {
            return Ok(());
        }
        self.state = SessionState::Closing;

        let reap = self.config.timeout.reap;
        let status = if force {
            lifecycle::force_kill(&mut self.child, reap).await
        } else {
            lifecycle::shutdown(
                &mut self.child,
                self.writer.as_mut(),
                &self.config.shutdown,
                self.config.line_ending.as_str(),
                reap,
            )
            .await
        };

        // Release the terminal: dropping the writer and letting the drain
        // task hit end of stream closes the master.
        self.writer = None;
        if let Some(mut drain) = self.drain.take() {
            if tokio::time::timeout(reap, &mut drain).await.is_err() {
                tracing::warn!(pid = self.child.pid(), "output still open after close; detaching reader");
                drain.abort();
            }
        }

        self.state = SessionState::Closed;
        tracing::debug!(pid = self.child.pid(), force, status = ?status, "session closed");
        Ok(())
    }

    /// The master keeps accepting bytes after the child is gone, so a write
    /// to an exited process has to be refused here.
    fn ensure_accepting_input(&mut self) -> Result<()> {
        if let Ok(Some(status)) = self.child.try_wait() {
            self.state = SessionState::Exited(status);
        }

        match self.state {
            SessionState::Exited(status) => Err(ExpectError::Write(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("process already exited ({status})"),
            ))),
            _ => Ok(()),
        }
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.state.is_usable() {
            Ok(())
        } else {
            Err(ExpectError::SessionClosed)
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state.is_closed() {
            return;
        }

        tracing::debug!(pid = self.child.pid(), "session dropped without close; killing process group");
        if let Err(e) = self.child.kill() {
            tracing::warn!(pid = self.child.pid(), error = %e, "failed to kill process group on drop");
        }
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pid", &self.child.pid())
            .field("state", &self.state)
            .field("command", &self.config.command)
            .finish_non_exhaustive()
    }
}
