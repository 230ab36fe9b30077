//! Synchronous wrapper for async expect operations.
//!
//! This module provides a blocking API for callers that are not running
//! inside a tokio runtime, such as plain `#[test]` functions.

use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use crate::config::SessionConfig;
use crate::error::{ExpectError, Result};
use crate::expect::PatternSet;
use crate::session::Session;
use crate::types::{ControlChar, Match, SessionState};

/// A synchronous session wrapper.
///
/// Each wrapper drives its session on a private current-thread runtime.
pub struct SyncSession {
    // Declared before the runtime so the session, and with it the process
    // group, is torn down while the runtime still exists.
    inner: Session,
    runtime: Runtime,
}

impl SyncSession {
    /// Spawn a session from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be created or spawning fails.
    pub fn spawn(config: SessionConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ExpectError::io_context("creating tokio runtime", e))?;

        let inner = runtime.block_on(Session::spawn(config))?;

        Ok(Self { inner, runtime })
    }

    /// Get the child process ID.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.inner.pid()
    }

    /// Get the current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// Get a copy of the unconsumed output.
    #[must_use]
    pub fn buffer(&self) -> String {
        self.inner.buffer()
    }

    /// Send bytes to the process.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.runtime.block_on(self.inner.send(data))
    }

    /// Send a line to the process.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        self.runtime.block_on(self.inner.send_line(line))
    }

    /// Send a control character to the process.
    ///
    /// # Errors
    ///
    /// See [`Session::send`].
    pub fn send_control(&mut self, ctrl: ControlChar) -> Result<()> {
        self.runtime.block_on(self.inner.send_control(ctrl))
    }

    /// Wait for one of `patterns` using the default timeout.
    ///
    /// # Errors
    ///
    /// See [`Session::expect`].
    pub fn expect(&mut self, patterns: impl Into<PatternSet>) -> Result<Match> {
        self.runtime.block_on(self.inner.expect(patterns))
    }

    /// Wait for one of `patterns` with an explicit timeout.
    ///
    /// # Errors
    ///
    /// See [`Session::expect`].
    pub fn expect_timeout(&mut self, patterns: impl Into<PatternSet>, timeout: Duration) -> Result<Match> {
        self.runtime
            .block_on(self.inner.expect_timeout(patterns, timeout))
    }

    /// Wait for the process to close its output.
    ///
    /// # Errors
    ///
    /// See [`Session::expect_eof`].
    pub fn expect_eof(&mut self) -> Result<String> {
        self.runtime.block_on(self.inner.expect_eof())
    }

    /// Close the session.
    ///
    /// # Errors
    ///
    /// See [`Session::close`].
    pub fn close(&mut self, force: bool) -> Result<()> {
        self.runtime.block_on(self.inner.close(force))
    }

    /// Run an arbitrary future against the underlying async session.
    pub fn block_on<F, T>(&mut self, f: F) -> T
    where
        F: AsyncFnOnce(&mut Session) -> T,
    {
        self.runtime.block_on(f(&mut self.inner))
    }
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
