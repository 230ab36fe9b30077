//! Session module for managing an interactive process.
//!
//! A [`Session`] owns one child on a pseudo-terminal. A background drain
//! task keeps the output flowing into a shared buffer while the caller
//! sends input and waits for patterns.
//!
//! # Example
//!
//! ```ignore
//! use esh_expect::{Pattern, SessionBuilder};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), esh_expect::ExpectError> {
//!     let mut session = SessionBuilder::new()
//!         .command("sh")
//!         .timeout(Duration::from_secs(5))
//!         .spawn()
//!         .await?;
//!
//!     session.send_line("echo $((6 * 7))").await?;
//!     let m = session.expect_regex(r"(\d+)\r\n").await?;
//!     assert_eq!(m.capture(0), Some("42"));
//!
//!     session.close(true).await
//! }
//! ```

mod builder;
mod drain;
mod handle;
mod lifecycle;

pub use builder::SessionBuilder;
pub use drain::LogSink;
pub use handle::Session;
pub use lifecycle::{ShutdownConfig, ShutdownStrategy};
