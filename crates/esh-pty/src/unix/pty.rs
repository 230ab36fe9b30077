//! Unix PTY allocation and management.
//!
//! This module provides the PTY master for Unix systems, using rustix for
//! the low-level PTY operations. The master can be split into a reader and
//! a writer that share one descriptor, so output can be drained continuously
//! while input is written from elsewhere.

use std::io;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use rustix::fs::{Mode, OFlags, fcntl_setfl};
use rustix::io::{FdFlags, fcntl_setfd};
use rustix::pty::{OpenptFlags, grantpt, openpt, ptsname, unlockpt};
use rustix::termios::{Winsize, tcgetwinsize, tcsetwinsize};
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::config::WindowSize;
use crate::error::{PtyError, Result, errno_to_io};

/// Descriptor state shared by the master and its split halves.
#[derive(Debug)]
struct Shared {
    async_fd: AsyncFd<OwnedFd>,
    /// Cleared once the writer is shut down.
    writable: AtomicBool,
}

/// Unix PTY master implementation.
///
/// This struct wraps the master side of a Unix pseudo-terminal. Use
/// [`UnixPtyMaster::into_split`] to obtain independent async halves.
pub struct UnixPtyMaster {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for UnixPtyMaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixPtyMaster")
            .field("fd", &self.shared.async_fd.as_raw_fd())
            .finish()
    }
}

impl UnixPtyMaster {
    /// Open a new PTY master.
    ///
    /// This allocates a new pseudo-terminal pair and returns the master side
    /// along with the path of the slave device.
    ///
    /// # Errors
    ///
    /// Returns an error if PTY allocation fails.
    pub fn open() -> Result<(Self, String)> {
        let create = |e: rustix::io::Errno| PtyError::Create(errno_to_io(e));

        let master_fd = openpt(OpenptFlags::RDWR | OpenptFlags::NOCTTY).map_err(create)?;
        grantpt(&master_fd).map_err(create)?;
        unlockpt(&master_fd).map_err(create)?;

        let slave_name = ptsname(&master_fd, Vec::new()).map_err(create)?;
        let slave_path = slave_name
            .to_str()
            .map_err(|_| {
                PtyError::Create(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid slave path encoding",
                ))
            })?
            .to_string();

        // The child must not inherit the master
        fcntl_setfd(&master_fd, FdFlags::CLOEXEC).map_err(create)?;
        fcntl_setfl(&master_fd, OFlags::NONBLOCK).map_err(create)?;

        let async_fd = AsyncFd::new(master_fd).map_err(PtyError::Create)?;

        Ok((
            Self {
                shared: Arc::new(Shared {
                    async_fd,
                    writable: AtomicBool::new(true),
                }),
            },
            slave_path,
        ))
    }

    /// Set the window size.
    pub fn set_window_size(&self, size: WindowSize) -> Result<()> {
        if size.cols == 0 || size.rows == 0 {
            return Err(PtyError::InvalidWindowSize {
                cols: size.cols,
                rows: size.rows,
            });
        }

        let winsize = Winsize {
            ws_col: size.cols,
            ws_row: size.rows,
            ws_xpixel: size.xpixel,
            ws_ypixel: size.ypixel,
        };

        tcsetwinsize(self.shared.async_fd.get_ref(), winsize)
            .map_err(|e| PtyError::Resize(errno_to_io(e)))
    }

    /// Get the current window size.
    pub fn get_window_size(&self) -> Result<WindowSize> {
        let winsize = tcgetwinsize(self.shared.async_fd.get_ref())
            .map_err(|e| PtyError::GetAttributes(errno_to_io(e)))?;

        Ok(WindowSize {
            cols: winsize.ws_col,
            rows: winsize.ws_row,
            xpixel: winsize.ws_xpixel,
            ypixel: winsize.ws_ypixel,
        })
    }

    /// Split the master into a reader and a writer.
    ///
    /// The descriptor is closed when both halves have been dropped.
    #[must_use]
    pub fn into_split(self) -> (PtyReader, PtyWriter) {
        (
            PtyReader {
                shared: Arc::clone(&self.shared),
            },
            PtyWriter {
                shared: self.shared,
            },
        )
    }
}

impl AsRawFd for UnixPtyMaster {
    fn as_raw_fd(&self) -> RawFd {
        self.shared.async_fd.as_raw_fd()
    }
}

/// The read half of a PTY master.
#[derive(Debug)]
pub struct PtyReader {
    shared: Arc<Shared>,
}

/// The write half of a PTY master.
#[derive(Debug)]
pub struct PtyWriter {
    shared: Arc<Shared>,
}

impl PtyWriter {
    /// Check whether the writer still accepts input.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.writable.load(Ordering::SeqCst)
    }

    /// Resize the terminal through the writer's handle.
    pub fn resize(&self, size: WindowSize) -> Result<()> {
        UnixPtyMaster {
            shared: Arc::clone(&self.shared),
        }
        .set_window_size(size)
    }
}

impl AsyncRead for PtyReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let async_fd = &self.shared.async_fd;

        loop {
            let mut guard = match async_fd.poll_read_ready(cx) {
                Poll::Ready(Ok(guard)) => guard,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            };

            let unfilled = buf.initialize_unfilled();
            match rustix::io::read(async_fd.get_ref(), unfilled) {
                Ok(n) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Err(rustix::io::Errno::AGAIN) => {
                    guard.clear_ready();
                }
                // Linux reports a hung-up slave as EIO rather than a zero read
                Err(rustix::io::Errno::IO) => return Poll::Ready(Ok(())),
                Err(e) => return Poll::Ready(Err(errno_to_io(e))),
            }
        }
    }
}

impl AsyncWrite for PtyWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if !self.is_open() {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "PTY closed")));
        }

        let async_fd = &self.shared.async_fd;

        loop {
            let mut guard = match async_fd.poll_write_ready(cx) {
                Poll::Ready(Ok(guard)) => guard,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            };

            match rustix::io::write(async_fd.get_ref(), buf) {
                Ok(n) => return Poll::Ready(Ok(n)),
                Err(rustix::io::Errno::AGAIN) => {
                    guard.clear_ready();
                }
                Err(rustix::io::Errno::IO) => {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "PTY slave hung up",
                    )));
                }
                Err(e) => return Poll::Ready(Err(errno_to_io(e))),
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.shared.writable.store(false, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// Open the slave side of a PTY.
///
/// The descriptor is close-on-exec; the child receives duplicates bound to
/// its standard streams.
pub fn open_slave(path: &str) -> Result<OwnedFd> {
    rustix::fs::open(
        path,
        OFlags::RDWR | OFlags::NOCTTY | OFlags::CLOEXEC,
        Mode::empty(),
    )
    .map_err(|e| PtyError::Create(errno_to_io(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn open_pty() {
        let (_master, slave_path) = UnixPtyMaster::open().expect("open pty");
        assert!(slave_path.starts_with("/dev/pts/") || slave_path.starts_with("/dev/pty"));
    }

    #[tokio::test]
    async fn window_size_operations() {
        let (master, _) = UnixPtyMaster::open().unwrap();

        let size = WindowSize::new(120, 40);
        assert!(master.set_window_size(size).is_ok());

        let retrieved = master.get_window_size().unwrap();
        assert_eq!(retrieved.cols, 120);
        assert_eq!(retrieved.rows, 40);
    }

    #[tokio::test]
    async fn zero_window_size_rejected() {
        let (master, _) = UnixPtyMaster::open().unwrap();
        let err = master.set_window_size(WindowSize::new(0, 24)).unwrap_err();
        assert!(matches!(err, PtyError::InvalidWindowSize { cols: 0, rows: 24 }));
    }

    #[tokio::test]
    async fn writer_rejects_after_shutdown() {
        let (master, _) = UnixPtyMaster::open().unwrap();
        let (_reader, mut writer) = master.into_split();

        writer.shutdown().await.unwrap();
        assert!(!writer.is_open());

        let err = writer.write_all(b"late").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
