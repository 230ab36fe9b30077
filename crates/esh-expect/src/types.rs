//! Common types for esh-expect.
//!
//! This module defines the match result returned by expect operations, the
//! session state machine and the control characters that can be sent.

use std::fmt;
use std::ops::Range;

use esh_pty::ExitStatus;

/// A match result from an expect operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The index of the pattern that matched.
    pub pattern_index: usize,

    /// The full text that matched.
    pub matched: String,

    /// Capture groups from regex patterns, in declaration order.
    ///
    /// Always one entry per declared group; a group that did not take part
    /// in the match is an empty string.
    pub captures: Vec<String>,

    /// Unmatched text that preceded the match and was discarded with it.
    pub before: String,

    /// Absolute stream offsets removed from the buffer by this match.
    ///
    /// Starts where the previous consumption ended and ends at the end of
    /// the match.
    pub consumed: Range<usize>,
}

impl Match {
    /// Get a capture group by index (0 is the first declared group).
    #[must_use]
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).map(String::as_str)
    }

    /// Get the full matched text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.matched
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.matched)
    }
}

/// The state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session is running and ready for operations.
    Running,

    /// Session is shutting the process down.
    Closing,

    /// Session is closed.
    Closed,

    /// Process has exited with status; the session has not been closed yet.
    Exited(ExitStatus),
}

impl SessionState {
    /// Check if the session accepts expect operations.
    ///
    /// An exited process still has output to drain, but sends to it fail.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        matches!(self, Self::Running | Self::Exited(_))
    }

    /// Check if the session is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
            Self::Exited(status) => write!(f, "exited ({status})"),
        }
    }
}

/// Control characters that can be sent to a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlChar {
    /// Ctrl+C (ETX) - Interrupt
    CtrlC,
    /// Ctrl+D (EOT) - End of file
    CtrlD,
    /// Ctrl+U (NAK) - Kill line
    CtrlU,
    /// Ctrl+Z (SUB) - Suspend
    CtrlZ,
    /// Ctrl+\ (FS) - Quit
    CtrlBackslash,
    /// Escape
    Escape,
}

impl ControlChar {
    /// Get the byte value of this control character.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::CtrlC => 0x03,
            Self::CtrlD => 0x04,
            Self::CtrlU => 0x15,
            Self::CtrlZ => 0x1A,
            Self::Escape => 0x1B,
            Self::CtrlBackslash => 0x1C,
        }
    }

    /// Create a control character from the key pressed with Ctrl.
    ///
    /// For example, `ControlChar::from_char('c')` returns `Some(ControlChar::CtrlC)`.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'c' => Some(Self::CtrlC),
            'd' => Some(Self::CtrlD),
            'u' => Some(Self::CtrlU),
            'z' => Some(Self::CtrlZ),
            '\\' => Some(Self::CtrlBackslash),
            '[' => Some(Self::Escape),
            _ => None,
        }
    }
}

impl From<ControlChar> for u8 {
    fn from(c: ControlChar) -> Self {
        c.as_byte()
    }
}
