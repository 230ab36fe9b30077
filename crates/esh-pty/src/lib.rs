//! esh-pty: async pseudo-terminal primitives for shell acceptance tests
//!
//! This crate allocates a pseudo-terminal pair, spawns the program under test
//! with its standard streams bound to the slave side, and hands back the
//! master side as independent async reader and writer halves.
//!
//! The child is always started as the leader of its own process group, so a
//! single signal reaches the shell together with every job it started.
//!
//! # Quick Start
//!
//! ```ignore
//! use esh_pty::{PtyConfig, spawn};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PtyConfig::default();
//!     let (master, mut child) = spawn("/bin/sh", ["-i"], &config).await?;
//!     let (mut reader, mut writer) = master.into_split();
//!
//!     writer.write_all(b"echo hello\n").await?;
//!
//!     let mut buf = [0u8; 1024];
//!     let n = reader.read(&mut buf).await?;
//!     println!("{}", String::from_utf8_lossy(&buf[..n]));
//!
//!     // Reclaim the shell and anything it started
//!     child.kill()?;
//!     child.wait().await?;
//!     Ok(())
//! }
//! ```

#![cfg(unix)]

pub mod config;
pub mod error;
pub mod status;
pub mod unix;

// Re-export primary types
pub use config::{PtyConfig, PtyConfigBuilder, PtySignal, WindowSize};
pub use error::{PtyError, Result};
pub use status::ExitStatus;
pub use unix::probe::{is_group_alive, is_process_alive};
pub use unix::{PtyReader, PtyWriter, UnixPtyChild, UnixPtyMaster, spawn};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PtyConfig::default();
        assert_eq!(config.window_size, (80, 24));
        assert!(config.new_session);
    }

    #[test]
    fn window_size_conversion() {
        let size = WindowSize::new(120, 40);
        assert_eq!(size.cols, 120);
        assert_eq!(size.rows, 40);
    }

    #[tokio::test]
    async fn spawn_echo() {
        let config = PtyConfig::default();
        let (_master, mut child) = spawn("echo", ["test"], &config)
            .await
            .expect("spawn echo");

        let status = child.wait().await.expect("wait for echo");
        assert!(status.success());
    }
}
