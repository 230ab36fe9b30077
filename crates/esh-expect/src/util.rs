//! Utility types shared by the session and the expect engine.

mod timeout;

pub use timeout::Deadline;
