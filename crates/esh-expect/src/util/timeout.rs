//! Deadlines for expect operations.

use std::time::Duration;

use tokio::time::Instant;

/// Roughly 30 years; stands in for "no deadline".
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// An absolute point in time after which an operation gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    deadline: Instant,
}

impl Deadline {
    /// Create a new deadline `duration` from now.
    ///
    /// Durations too large to represent are clamped to the far future.
    #[must_use]
    pub fn from_now(duration: Duration) -> Self {
        let now = Instant::now();
        Self {
            deadline: now.checked_add(duration).unwrap_or(now + FAR_FUTURE),
        }
    }

    /// Create a deadline at a fixed instant.
    #[must_use]
    pub const fn at(deadline: Instant) -> Self {
        Self { deadline }
    }

    /// The instant this deadline expires.
    #[must_use]
    pub const fn instant(&self) -> Instant {
        self.deadline
    }

    /// Check if the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Get the remaining time until the deadline.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Sleep until the deadline.
    ///
    /// Resolves immediately if the deadline has already passed.
    pub async fn sleep(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }
}
