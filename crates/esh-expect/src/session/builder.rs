//! Session builder for constructing sessions with custom configuration.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use super::drain::LogSink;
use super::handle::Session;
use super::lifecycle::ShutdownConfig;
use crate::config::{LineEnding, SessionConfig, TimeoutConfig};
use crate::error::Result;

/// Builder for spawning sessions.
#[derive(Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    sink: LogSink,
}

impl SessionBuilder {
    /// Create a new session builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the command to execute.
    #[must_use]
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.config.command = command.into();
        self
    }

    /// Set the command arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.config.args.push(arg.into());
        self
    }

    /// Set a single environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.env.insert(key.into(), value.into());
        self
    }

    /// Add environment variables.
    #[must_use]
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config
            .env
            .extend(envs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Start from an empty environment plus whatever `env` adds.
    #[must_use]
    pub const fn clear_env(mut self) -> Self {
        self.config.inherit_env = false;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.working_dir = Some(path.into());
        self
    }

    /// Set the terminal dimensions (width, height).
    #[must_use]
    pub const fn dimensions(mut self, cols: u16, rows: u16) -> Self {
        self.config.dimensions = (cols, rows);
        self
    }

    /// Set the default expect timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout.default = timeout;
        self
    }

    /// Set the timeout configuration.
    #[must_use]
    pub const fn timeout_config(mut self, config: TimeoutConfig) -> Self {
        self.config.timeout = config;
        self
    }

    /// Set the line ending style.
    #[must_use]
    pub const fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.config.line_ending = line_ending;
        self
    }

    /// Mirror raw output to a file, truncating it.
    #[must_use]
    pub fn log_to_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.logging.log_file = Some(path.into());
        self
    }

    /// Mirror raw output to standard output.
    #[must_use]
    pub const fn log_user(mut self, enabled: bool) -> Self {
        self.config.logging.log_user = enabled;
        self
    }

    /// Mirror raw output to an arbitrary writer.
    #[must_use]
    pub fn log_sink(mut self, writer: impl Write + Send + 'static) -> Self {
        self.sink.push(writer);
        self
    }

    /// Set how the session is brought down on a non-forced close.
    #[must_use]
    pub fn shutdown(mut self, shutdown: ShutdownConfig) -> Self {
        self.config.shutdown = shutdown;
        self
    }

    /// Build the session configuration.
    ///
    /// Writers added with [`SessionBuilder::log_sink`] are not part of the
    /// configuration and are discarded.
    #[must_use]
    pub fn build(self) -> SessionConfig {
        self.config
    }

    /// Spawn the session.
    ///
    /// # Errors
    ///
    /// See [`Session::spawn`].
    pub async fn spawn(self) -> Result<Session> {
        Session::spawn_with_sink(self.config, self.sink).await
    }
}

impl From<SessionBuilder> for SessionConfig {
    fn from(builder: SessionBuilder) -> Self {
        builder.build()
    }
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("config", &self.config)
            .field("sink", &self.sink)
            .finish()
    }
}
