//! Accumulated process output.
//!
//! The buffer holds every byte read from the process that has not yet been
//! consumed by a match, plus the end-of-stream marker. Offsets reported to
//! callers are absolute positions in the stream, counted from the first
//! byte the process ever wrote.

use std::fmt;

use bytes::{Bytes, BytesMut};

/// Initial allocation for a session's output buffer.
pub const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Unconsumed process output plus the end-of-stream marker.
#[derive(Clone, Default)]
pub struct OutputBuffer {
    data: BytesMut,
    /// Absolute stream offset of `data[0]`.
    offset: usize,
    eof: bool,
}

impl OutputBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty buffer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            offset: 0,
            eof: false,
        }
    }

    /// Append newly read bytes.
    pub fn append(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    /// The unconsumed bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of unconsumed bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether there are no unconsumed bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Absolute stream offset of the first unconsumed byte.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Total bytes received so far, consumed or not.
    #[must_use]
    pub fn total_received(&self) -> usize {
        self.offset + self.data.len()
    }

    /// Remove and return the first `n` bytes.
    ///
    /// `n` is clamped to the buffer length.
    pub fn consume(&mut self, n: usize) -> Bytes {
        let n = n.min(self.data.len());
        self.offset += n;
        self.data.split_to(n).freeze()
    }

    /// Remove and return everything buffered.
    pub fn consume_all(&mut self) -> Bytes {
        self.consume(self.data.len())
    }

    /// Record that the process closed its output.
    pub const fn mark_eof(&mut self) {
        self.eof = true;
    }

    /// Check whether the process closed its output.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.eof
    }

    /// The unconsumed bytes as text, replacing invalid UTF-8.
    #[must_use]
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

impl fmt::Debug for OutputBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputBuffer")
            .field("len", &self.data.len())
            .field("offset", &self.offset)
            .field("eof", &self.eof)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_consume() {
        let mut buffer = OutputBuffer::new();
        buffer.append(b"hello ");
        buffer.append(b"world");
        assert_eq!(buffer.as_bytes(), b"hello world");

        let taken = buffer.consume(6);
        assert_eq!(&taken[..], b"hello ");
        assert_eq!(buffer.as_bytes(), b"world");
        assert_eq!(buffer.offset(), 6);
        assert_eq!(buffer.total_received(), 11);
    }

    #[test]
    fn consume_is_clamped() {
        let mut buffer = OutputBuffer::new();
        buffer.append(b"abc");
        assert_eq!(&buffer.consume(10)[..], b"abc");
        assert!(buffer.is_empty());
        assert_eq!(buffer.offset(), 3);
    }

    #[test]
    fn eof_marker() {
        let mut buffer = OutputBuffer::new();
        assert!(!buffer.is_eof());
        buffer.append(b"tail");
        buffer.mark_eof();
        assert!(buffer.is_eof());
        assert_eq!(buffer.to_string_lossy(), "tail");
        assert_eq!(&buffer.consume_all()[..], b"tail");
    }

    #[test]
    fn lossy_text() {
        let mut buffer = OutputBuffer::new();
        buffer.append(&[b'o', b'k', 0xff]);
        assert_eq!(buffer.to_string_lossy(), "ok\u{fffd}");
    }
}
