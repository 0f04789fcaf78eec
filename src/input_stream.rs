//! Buffered byte source for the matcher
//!
//! Pulls fixed-size blocks from an underlying reader on demand and keeps
//! everything that has not been accepted yet in memory, so the matcher can
//! backtrack to any position within unconsumed input.

use std::fmt;
use std::io::Read;

/// Bytes are read from the source in blocks of this size.
const BLOCK: usize = 1024;

/// On-demand buffered input. Positions handed to [`get`](InputStream::get)
/// and [`slice`](InputStream::slice) are byte offsets into the live buffer;
/// they stay valid until [`discard`](InputStream::discard) erases a prefix.
pub struct InputStream {
    source: Option<Box<dyn Read>>,
    buf: Vec<u8>,
}

impl InputStream {
    /// Create an input stream over a reader (a file, stdin, a socket, ...).
    pub fn from_reader(source: impl Read + 'static) -> Self {
        InputStream {
            source: Some(Box::new(source)),
            buf: Vec::with_capacity(BLOCK),
        }
    }

    /// Create an input stream over in-memory bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        InputStream {
            source: None,
            buf: bytes.into(),
        }
    }

    /// Create an input stream over an in-memory string.
    pub fn from_str(text: &str) -> Self {
        Self::from_bytes(text.as_bytes().to_vec())
    }

    /// Get the byte at `pos`, refilling from the source as needed.
    /// Returns `None` at end of stream. Read errors end the stream.
    pub(crate) fn get(&mut self, pos: usize) -> Option<u8> {
        while pos >= self.buf.len() {
            if !self.fill() {
                return None;
            }
        }
        Some(self.buf[pos])
    }

    /// Pull one block from the source. Returns false when no more input
    /// can be obtained.
    fn fill(&mut self) -> bool {
        let source = match self.source.as_mut() {
            Some(source) => source,
            None => return false,
        };
        let mut block = [0u8; BLOCK];
        match source.read(&mut block) {
            Ok(0) | Err(_) => false,
            Ok(n) => {
                self.buf.extend_from_slice(&block[..n]);
                true
            }
        }
    }

    /// Borrow the buffered bytes in `[begin, end)`, clamped to the buffer.
    pub(crate) fn slice(&self, begin: usize, end: usize) -> &[u8] {
        let end = end.min(self.buf.len());
        let begin = begin.min(end);
        &self.buf[begin..end]
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Erase the first `n` buffered bytes; later positions shift down by `n`.
    pub(crate) fn discard(&mut self, n: usize) {
        self.buf.drain(..n.min(self.buf.len()));
    }

    /// Drop everything buffered without reading further.
    pub(crate) fn discard_all(&mut self) {
        self.buf.clear();
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InputStream(buffered={}, live={})",
            self.buf.len(),
            self.source.is_some()
        )
    }
}
