//! Configuration types for esh-expect.
//!
//! This module defines configuration structures for sessions, timeouts,
//! session logging and line endings.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use esh_pty::PtyConfig;

use crate::session::ShutdownConfig;

/// Default timeout duration (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on waiting for a killed process to be reaped.
pub const DEFAULT_REAP_TIMEOUT: Duration = Duration::from_secs(2);

/// Default terminal width.
pub const DEFAULT_TERMINAL_WIDTH: u16 = 80;

/// Default terminal height.
pub const DEFAULT_TERMINAL_HEIGHT: u16 = 24;

/// Default TERM environment variable value.
///
/// Output is captured raw, so the shell is asked not to emit escape sequences.
pub const DEFAULT_TERM: &str = "dumb";

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The command to execute.
    pub command: String,

    /// Command arguments.
    pub args: Vec<String>,

    /// Environment variables to set.
    pub env: HashMap<String, String>,

    /// Whether to inherit the parent environment.
    pub inherit_env: bool,

    /// Working directory for the process.
    pub working_dir: Option<PathBuf>,

    /// Terminal dimensions (width, height).
    pub dimensions: (u16, u16),

    /// Timeout configuration.
    pub timeout: TimeoutConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Line ending appended by `send_line`.
    pub line_ending: LineEnding,

    /// How a non-forced close shuts the process down.
    pub shutdown: ShutdownConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let mut env = HashMap::new();
        env.insert("TERM".to_string(), DEFAULT_TERM.to_string());

        Self {
            command: String::new(),
            args: Vec::new(),
            env,
            inherit_env: true,
            working_dir: None,
            dimensions: (DEFAULT_TERMINAL_WIDTH, DEFAULT_TERMINAL_HEIGHT),
            timeout: TimeoutConfig::default(),
            logging: LoggingConfig::default(),
            line_ending: LineEnding::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Create a new session configuration with the given command.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Set the command arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set whether to inherit the parent environment.
    #[must_use]
    pub const fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    /// Set the terminal dimensions.
    #[must_use]
    pub const fn dimensions(mut self, width: u16, height: u16) -> Self {
        self.dimensions = (width, height);
        self
    }

    /// Set the default expect timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout.default = timeout;
        self
    }

    /// Set the line ending style.
    #[must_use]
    pub const fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Set the shutdown policy.
    #[must_use]
    pub fn shutdown(mut self, shutdown: ShutdownConfig) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Translate into the PTY layer's spawn configuration.
    pub(crate) fn pty_config(&self) -> PtyConfig {
        let mut builder = PtyConfig::builder().window_size(self.dimensions.0, self.dimensions.1);

        if !self.inherit_env {
            builder = builder.env_clear();
        }
        for (key, value) in &self.env {
            builder = builder.env(key, value);
        }
        if let Some(ref dir) = self.working_dir {
            builder = builder.working_directory(dir);
        }

        builder.build()
    }
}

/// Configuration for timeouts.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutConfig {
    /// Default timeout for expect operations.
    pub default: Duration,

    /// How long to wait for a killed process to be reaped.
    pub reap: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default: DEFAULT_TIMEOUT,
            reap: DEFAULT_REAP_TIMEOUT,
        }
    }
}

impl TimeoutConfig {
    /// Create a new timeout configuration with the given default timeout.
    #[must_use]
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            ..Default::default()
        }
    }

    /// Set the reap timeout.
    #[must_use]
    pub const fn reap(mut self, timeout: Duration) -> Self {
        self.reap = timeout;
        self
    }
}

/// Configuration for the raw session log.
///
/// Every byte read from the process is mirrored verbatim to the configured
/// destinations.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Path to log file (truncated on spawn).
    pub log_file: Option<PathBuf>,

    /// Whether to echo output to stdout.
    pub log_user: bool,
}

impl LoggingConfig {
    /// Create a new logging configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log file path.
    #[must_use]
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Set whether to echo to stdout.
    #[must_use]
    pub const fn log_user(mut self, enabled: bool) -> Self {
        self.log_user = enabled;
        self
    }

    /// Check whether any destination is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.log_file.is_some() || self.log_user
    }
}

/// Line ending styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    /// Unix-style line ending (LF).
    #[default]
    Lf,

    /// Windows-style line ending (CRLF).
    CrLf,

    /// Carriage return only, as typed on a terminal.
    Cr,
}

impl LineEnding {
    /// Get the line ending as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }
}
