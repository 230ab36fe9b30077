//! Error types for esh-expect.
//!
//! Errors carry enough context to diagnose a failing scenario on their own:
//! a timeout or an unexpected exit renders the patterns that were being
//! waited for and the unmatched output that was buffered at that moment.

use std::time::Duration;

use esh_pty::{ExitStatus, PtyError};
use thiserror::Error;

/// Maximum length of buffer content to display in error messages.
const MAX_BUFFER_DISPLAY: usize = 500;

/// Lines kept from the tail of a long buffer.
const TAIL_LINES: usize = 6;

/// Format buffer content for display, truncating if necessary.
fn format_buffer_snippet(buffer: &str) -> String {
    if buffer.is_empty() {
        return "(empty buffer)".to_string();
    }

    let buffer_len = buffer.len();
    let lines: Vec<&str> = buffer.lines().collect();
    let total_lines = lines.len();

    if buffer_len <= MAX_BUFFER_DISPLAY || total_lines <= TAIL_LINES {
        return format!(
            "┌─ buffer ({buffer_len} bytes) ──────────────────────\n│ {}\n└────────────────────────────────────────",
            lines.join("\n│ ")
        );
    }

    let tail = &lines[total_lines - TAIL_LINES..];
    let hidden = total_lines - tail.len();

    format!(
        "┌─ buffer ({buffer_len} bytes, {total_lines} lines) ─────────────\n│ ... ({hidden} lines hidden)\n│ {}\n└────────────────────────────────────────",
        tail.join("\n│ ")
    )
}

fn format_timeout_error(duration: Duration, patterns: &str, buffer: &str) -> String {
    format!(
        "timeout after {duration:?} waiting for output\n\
         \n\
         Patterns: {patterns}\n\
         \n\
         {}",
        format_buffer_snippet(buffer)
    )
}

fn format_process_exited_error(status: Option<&ExitStatus>, patterns: &str, buffer: &str) -> String {
    let status = status.map_or_else(|| "status not yet reaped".to_string(), ToString::to_string);
    format!(
        "process exited before any pattern matched ({status})\n\
         \n\
         Patterns: {patterns}\n\
         \n\
         {}",
        format_buffer_snippet(buffer)
    )
}

/// The main error type for esh-expect operations.
#[derive(Debug, Error)]
pub enum ExpectError {
    /// Failed to spawn a process.
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] SpawnError),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing input to the process failed, usually because it already exited.
    #[error("failed to write to process: {0}")]
    Write(#[source] std::io::Error),

    /// No pattern matched before the deadline.
    #[error("{}", format_timeout_error(*duration, patterns, buffer))]
    Timeout {
        /// The timeout duration that elapsed.
        duration: Duration,
        /// The patterns that were being searched for.
        patterns: String,
        /// Unconsumed buffer contents at the time of timeout.
        buffer: String,
    },

    /// The process closed its output before any pattern matched.
    #[error("{}", format_process_exited_error(status.as_ref(), patterns, buffer))]
    ProcessExited {
        /// The exit status, if the process had been reaped already.
        status: Option<ExitStatus>,
        /// The patterns that were being searched for.
        patterns: String,
        /// Unconsumed buffer contents at end of stream.
        buffer: String,
    },

    /// The pattern could not be used.
    #[error("invalid pattern: {message}")]
    InvalidPattern {
        /// Description of what's wrong with the pattern.
        message: String,
    },

    /// Invalid regex pattern.
    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Session is closed.
    #[error("session is closed")]
    SessionClosed,

    /// Signalling or reaping the process failed.
    #[error("process control failed: {0}")]
    Process(#[from] PtyError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Errors related to process spawning.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// Command not found.
    #[error("command not found: {command}")]
    CommandNotFound {
        /// The command that was not found.
        command: String,
    },

    /// Permission denied.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// The path that could not be executed.
        path: String,
    },

    /// PTY allocation failed.
    #[error("failed to allocate PTY: {reason}")]
    PtyAllocation {
        /// The reason for the failure.
        reason: String,
    },

    /// Working directory error.
    #[error("invalid working directory: {path}")]
    InvalidWorkingDir {
        /// The invalid working directory path.
        path: String,
    },

    /// General I/O error during spawn.
    #[error("I/O error during spawn: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for esh-expect operations.
pub type Result<T> = std::result::Result<T, ExpectError>;

impl ExpectError {
    /// Create a timeout error with the given details.
    pub fn timeout(duration: Duration, patterns: impl Into<String>, buffer: impl Into<String>) -> Self {
        Self::Timeout {
            duration,
            patterns: patterns.into(),
            buffer: buffer.into(),
        }
    }

    /// Create a process exited error.
    pub fn process_exited(
        status: Option<ExitStatus>,
        patterns: impl Into<String>,
        buffer: impl Into<String>,
    ) -> Self {
        Self::ProcessExited {
            status,
            patterns: patterns.into(),
            buffer: buffer.into(),
        }
    }

    /// Create an invalid pattern error.
    pub fn invalid_pattern(message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Check if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if the process ended before a match.
    #[must_use]
    pub const fn is_process_exited(&self) -> bool {
        matches!(self, Self::ProcessExited { .. })
    }

    /// Check if the session was already closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::SessionClosed)
    }

    /// Get the buffer contents if this error contains them.
    #[must_use]
    pub fn buffer(&self) -> Option<&str> {
        match self {
            Self::Timeout { buffer, .. } | Self::ProcessExited { buffer, .. } => Some(buffer),
            _ => None,
        }
    }
}

impl SpawnError {
    /// Create a command not found error.
    pub fn command_not_found(command: impl Into<String>) -> Self {
        Self::CommandNotFound {
            command: command.into(),
        }
    }

    /// Create a PTY allocation error.
    pub fn pty_allocation(reason: impl Into<String>) -> Self {
        Self::PtyAllocation {
            reason: reason.into(),
        }
    }

    /// Classify a PTY-layer failure for `command`.
    pub(crate) fn from_pty(command: &str, err: PtyError) -> Self {
        match err {
            PtyError::Spawn(e) => match e.kind() {
                std::io::ErrorKind::NotFound => Self::command_not_found(command),
                std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                    path: command.to_string(),
                },
                _ => Self::Io(e),
            },
            PtyError::Create(e) | PtyError::Resize(e) => Self::pty_allocation(e.to_string()),
            PtyError::Io(e) => Self::Io(e),
            other => Self::pty_allocation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display() {
        let err = ExpectError::timeout(Duration::from_secs(5), "'password:'", "Enter username: admin\n");
        let msg = err.to_string();
        assert!(msg.contains("timeout"));
        assert!(msg.contains("password:"));
        assert!(msg.contains("admin"));
        assert!(msg.contains("Patterns:"));
    }

    #[test]
    fn process_exited_display_differs_from_timeout() {
        let exited = ExpectError::process_exited(Some(ExitStatus::Exited(1)), "'esh> '", "bye\n");
        let msg = exited.to_string();
        assert!(msg.contains("process exited"));
        assert!(msg.contains("exited with code 1"));
        assert!(!msg.contains("timeout"));

        let unreaped = ExpectError::process_exited(None, "'x'", "");
        assert!(unreaped.to_string().contains("not yet reaped"));
    }

    #[test]
    fn empty_buffer_snippet() {
        assert_eq!(format_buffer_snippet(""), "(empty buffer)");
    }

    #[test]
    fn small_buffer_snippet() {
        let result = format_buffer_snippet("hello\nworld");
        assert!(result.contains("hello"));
        assert!(result.contains("world"));
        assert!(result.contains("11 bytes"));
    }

    #[test]
    fn large_buffer_truncation() {
        let large: String = (0..50).fold(String::new(), |mut acc, i| {
            use std::fmt::Write;
            let _ = writeln!(acc, "Line {i}: Some content here");
            acc
        });

        let msg = ExpectError::timeout(Duration::from_secs(1), "pattern", &large).to_string();
        assert!(msg.contains("44 lines hidden"));
        assert!(msg.contains("Line 49"));
        assert!(!msg.contains("Line 10:"));
    }

    #[test]
    fn predicates_and_buffer() {
        let timeout = ExpectError::timeout(Duration::from_secs(1), "test", "the buffer");
        assert!(timeout.is_timeout());
        assert_eq!(timeout.buffer(), Some("the buffer"));

        let closed = ExpectError::SessionClosed;
        assert!(closed.is_closed());
        assert!(closed.buffer().is_none());
    }

    #[test]
    fn spawn_error_from_pty() {
        let err = SpawnError::from_pty(
            "/nope",
            PtyError::Spawn(std::io::Error::new(std::io::ErrorKind::NotFound, "missing")),
        );
        assert!(matches!(err, SpawnError::CommandNotFound { ref command } if command == "/nope"));

        let err = SpawnError::from_pty("sh", PtyError::Create(std::io::Error::other("no ptys")));
        assert!(err.to_string().contains("no ptys"));
    }
}
