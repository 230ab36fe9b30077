//! Background reader that keeps the process output flowing.
//!
//! One drain task runs per session for as long as the PTY produces output.
//! It reads whatever is available, mirrors it to the session log, appends it
//! to the shared buffer and bumps a generation counter so that a waiting
//! expect call rescans. The process is therefore never stalled on a full
//! terminal buffer, whether or not anyone is currently expecting.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use esh_pty::PtyReader;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::expect::OutputBuffer;

/// Read size for one drain iteration.
const CHUNK_SIZE: usize = 4096;

/// Buffer shared between the drain task and the session.
pub(crate) type SharedBuffer = Arc<Mutex<OutputBuffer>>;

/// Lock the shared buffer.
///
/// A panic while holding the lock cannot leave the buffer half-updated, so
/// a poisoned lock is recovered rather than propagated.
pub(crate) fn lock(buffer: &Mutex<OutputBuffer>) -> MutexGuard<'_, OutputBuffer> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Destinations that receive a verbatim copy of everything the process writes.
#[derive(Default)]
pub struct LogSink {
    writers: Vec<Box<dyn Write + Send>>,
}

impl LogSink {
    /// Create a sink with no destinations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink with a single destination.
    #[must_use]
    pub fn to(writer: impl Write + Send + 'static) -> Self {
        let mut sink = Self::new();
        sink.push(writer);
        sink
    }

    /// Add a destination.
    pub fn push(&mut self, writer: impl Write + Send + 'static) {
        self.writers.push(Box::new(writer));
    }

    /// Check whether there are no destinations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    /// Mirror one chunk. A destination that fails is dropped.
    fn write_chunk(&mut self, chunk: &[u8]) {
        self.writers.retain_mut(|writer| match writer.write_all(chunk).and_then(|()| writer.flush()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "session log write failed; detaching log destination");
                false
            }
        });
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("writers", &self.writers.len())
            .finish()
    }
}

/// Start the drain task.
///
/// `updates` is bumped after every append and once more after end of stream
/// is recorded; the sender is dropped when the task ends.
pub(crate) fn spawn_drain(
    reader: PtyReader,
    buffer: SharedBuffer,
    sink: LogSink,
    updates: watch::Sender<u64>,
    pid: u32,
) -> JoinHandle<()> {
    tokio::spawn(drain(reader, buffer, sink, updates, pid))
}

async fn drain(mut reader: PtyReader, buffer: SharedBuffer, mut sink: LogSink, updates: watch::Sender<u64>, pid: u32) {
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut total = 0usize;

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                tracing::trace!(pid, bytes = n, total, "drained output");

                sink.write_chunk(&chunk[..n]);
                lock(&buffer).append(&chunk[..n]);
                updates.send_modify(|generation| *generation += 1);
            }
            Err(e) => {
                tracing::warn!(pid, error = %e, "reading process output failed; treating as end of stream");
                break;
            }
        }
    }

    lock(&buffer).mark_eof();
    updates.send_modify(|generation| *generation += 1);
    tracing::debug!(pid, total, "process output closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct Broken(Arc<AtomicUsize>);

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_mirrors_verbatim() {
        let out = Arc::new(Mutex::new(Vec::new()));
        let mut sink = LogSink::new();
        sink.push(Shared(Arc::clone(&out)));

        sink.write_chunk(b"esh> ");
        sink.write_chunk(b"\x1b[0m\r\n");

        assert_eq!(&*out.lock().unwrap(), b"esh> \x1b[0m\r\n");
    }

    #[test]
    fn failing_destination_is_detached() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let out = Arc::new(Mutex::new(Vec::new()));
        let mut sink = LogSink::new();
        sink.push(Broken(Arc::clone(&attempts)));
        sink.push(Shared(Arc::clone(&out)));

        sink.write_chunk(b"one");
        sink.write_chunk(b"two");

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(&*out.lock().unwrap(), b"onetwo");
        assert!(!sink.is_empty());
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let buffer: SharedBuffer = Arc::new(Mutex::new(OutputBuffer::new()));
        let clone = Arc::clone(&buffer);
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison");
        })
        .join();

        lock(&buffer).append(b"still usable");
        assert_eq!(lock(&buffer).as_bytes(), b"still usable");
    }
}
