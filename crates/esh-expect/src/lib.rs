//! esh-expect: expect-style driver for interactive shells under test
//!
//! This crate spawns a program on a pseudo-terminal and lets a test talk to
//! it the way a person at a terminal would: send a line, wait until the
//! output shows one of several patterns, inspect what matched.
//!
//! # Features
//!
//! - **Continuous draining** of process output into a shared buffer
//! - **Multi-pattern expect** where the earliest match wins and ties go to
//!   the pattern listed first
//! - **Deadlines** that report the unmatched output and keep it for the
//!   next call
//! - **Process-group cleanup** on close and on drop, reaching background jobs
//! - **Raw session logs** mirrored to a file, stdout or any writer
//!
//! # Example
//!
//! ```ignore
//! use esh_expect::{Pattern, PatternSet, SessionBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), esh_expect::ExpectError> {
//!     let mut session = SessionBuilder::new().command("sh").spawn().await?;
//!     session.send_line("echo ready").await?;
//!
//!     let patterns = PatternSet::from(vec![Pattern::literal("ready"), Pattern::regex("error: .*")?]);
//!     let m = session.expect(patterns).await?;
//!     assert_eq!(m.pattern_index, 0);
//!
//!     session.close(true).await
//! }
//! ```

#![cfg(unix)]

pub mod config;
pub mod error;
pub mod expect;
pub mod session;
pub mod sync;
pub mod types;
pub mod util;

pub use config::{LineEnding, LoggingConfig, SessionConfig, TimeoutConfig};
pub use error::{ExpectError, Result, SpawnError};
pub use esh_pty::ExitStatus;
pub use expect::{CompiledRegex, Matcher, OutputBuffer, Pattern, PatternSet};
pub use session::{LogSink, Session, SessionBuilder, ShutdownConfig, ShutdownStrategy};
pub use sync::SyncSession;
pub use types::{ControlChar, Match, SessionState};
pub use util::Deadline;
