//! Scenario failures.

use esh_expect::{ExpectError, Pattern};

use crate::definitions::DefinitionsError;

/// Why a scenario did not pass.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The session failed: spawn, write, timeout, early exit or closed.
    #[error(transparent)]
    Expect(#[from] ExpectError),

    /// A different alternative matched than the one the scenario requires.
    #[error("{context}: expected {expected} but matched {actual} ({matched:?})")]
    Mismatch {
        /// What the scenario was checking.
        context: String,
        /// The alternative that should have matched.
        expected: String,
        /// The alternative that did match.
        actual: String,
        /// The matched text.
        matched: String,
    },

    /// A check on captured output failed.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// The run was cancelled from outside.
    #[error("interrupted")]
    Interrupted,

    /// The definitions are unusable.
    #[error(transparent)]
    Definitions(#[from] DefinitionsError),
}

/// Result type for scenarios.
pub type Result<T> = std::result::Result<T, ScenarioError>;

impl ScenarioError {
    /// Create an assertion failure.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// Create a mismatch failure.
    pub(crate) fn mismatch(context: &str, expected: &Pattern, actual: &Pattern, matched: &str) -> Self {
        Self::Mismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            matched: matched.to_string(),
        }
    }

    /// Short label distinguishing the failure kinds in reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Expect(ExpectError::Timeout { .. }) => "timeout",
            Self::Expect(ExpectError::ProcessExited { .. }) => "unexpected exit",
            Self::Expect(ExpectError::Spawn(_)) => "spawn failure",
            Self::Expect(ExpectError::SessionClosed) => "session closed",
            Self::Expect(ExpectError::Write(_)) => "write failure",
            Self::Expect(_) => "session error",
            Self::Mismatch { .. } => "pattern mismatch",
            Self::Assertion(_) => "assertion failed",
            Self::Interrupted => "interrupted",
            Self::Definitions(_) => "bad definitions",
        }
    }
}
