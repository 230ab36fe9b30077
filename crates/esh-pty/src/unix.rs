//! Unix platform implementation for PTY operations.
//!
//! This module provides:
//!
//! - PTY master/slave pair allocation via openpt/grantpt/unlockpt
//! - Async I/O through tokio's `AsyncFd`, split into reader and writer halves
//! - Child process spawning as a session and process-group leader
//! - Process-table probes used to confirm that nothing was left running
//!
//! # Example
//!
//! ```ignore
//! use esh_pty::{PtyConfig, unix::spawn};
//!
//! let config = PtyConfig::default();
//! let (master, child) = spawn("/bin/sh", ["-i"], &config).await?;
//! ```

mod child;
pub mod probe;
mod pty;

use std::ffi::OsStr;

pub use child::{UnixPtyChild, spawn_child};
pub use pty::{PtyReader, PtyWriter, UnixPtyMaster, open_slave};

use crate::config::PtyConfig;
use crate::error::Result;

/// Spawn `program` on a freshly allocated PTY.
///
/// Returns the master side and a handle to the child. The slave side is
/// closed in the parent once the child holds it, so the master reports
/// end-of-stream as soon as the child and all of its descendants are gone.
///
/// # Errors
///
/// Returns [`PtyError::Create`](crate::PtyError::Create) if the PTY cannot be
/// allocated and [`PtyError::Spawn`](crate::PtyError::Spawn) if the program
/// cannot be started.
pub async fn spawn<S, I>(program: S, args: I, config: &PtyConfig) -> Result<(UnixPtyMaster, UnixPtyChild)>
where
    S: AsRef<OsStr>,
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let (master, slave_path) = UnixPtyMaster::open()?;

    master.set_window_size(config.window_size.into())?;

    let slave_fd = open_slave(&slave_path)?;

    let child = spawn_child(slave_fd, program, args, config).await?;

    tracing::debug!(pid = child.pid(), slave = %slave_path, "spawned child on pty");

    Ok((master, child))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn spawn_cat_round_trip() {
        let config = PtyConfig::default();
        let (master, mut child) = spawn("cat", std::iter::empty::<&str>(), &config)
            .await
            .expect("spawn cat");
        let (mut reader, mut writer) = master.into_split();

        writer.write_all(b"ping\n").await.expect("write");

        let mut seen = Vec::new();
        let mut buf = [0u8; 256];
        while !String::from_utf8_lossy(&seen).contains("ping\r\nping") {
            let n = reader.read(&mut buf).await.expect("read");
            assert!(n > 0, "unexpected end of stream");
            seen.extend_from_slice(&buf[..n]);
        }

        child.kill().expect("kill");
        child.wait().await.expect("wait");
    }

    #[tokio::test]
    async fn spawn_missing_program() {
        let config = PtyConfig::default();
        let err = spawn("/definitely/not/here", std::iter::empty::<&str>(), &config)
            .await
            .expect_err("missing program must fail");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn end_of_stream_after_exit() {
        let config = PtyConfig::default();
        let (master, mut child) = spawn("echo", ["bye"], &config).await.expect("spawn echo");
        let (mut reader, _writer) = master.into_split();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.expect("read to end");
        assert!(String::from_utf8_lossy(&out).contains("bye"));

        child.wait().await.expect("wait");
    }
}
