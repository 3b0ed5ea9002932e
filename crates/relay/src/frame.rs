//! Newline framing for the upstream telemetry stream.
//!
//! The scheduler writes one record per line. TCP hands us arbitrary slices of
//! that stream, so the decoder keeps whatever follows the last `\n` until a
//! later chunk completes it. There is no cap on the pending tail: a peer that
//! never sends a newline grows it without bound.

use std::fmt;

use bytes::{Bytes, BytesMut};

/// One complete line from upstream, without its terminating `\n`.
///
/// Backed by a shared immutable buffer, so handing a clone to every
/// subscriber never copies the payload.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Frame(Bytes);

impl Frame {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// The frame as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the frame holds nothing but ASCII whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(u8::is_ascii_whitespace)
    }

    /// Lossy, length-bounded rendering for log lines.
    pub fn preview(&self, max_bytes: usize) -> String {
        let end = self.0.len().min(max_bytes);
        let mut text = String::from_utf8_lossy(&self.0[..end]).into_owned();
        if self.0.len() > max_bytes {
            text.push_str("...");
        }
        text
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frame").field(&self.preview(64)).finish()
    }
}

impl From<&str> for Frame {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Frame {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Incremental line splitter owned by a single upstream connection.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
    /// Prefix of `buf` already known to contain no `\n`.
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a previously pending tail.
    pub fn with_pending(pending: &[u8]) -> Self {
        Self {
            buf: BytesMut::from(pending),
            scanned: 0,
        }
    }

    /// Append `chunk` and return every frame it completes, in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut from = self.scanned;
        while let Some(offset) = self.buf[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            let mut line = self.buf.split_to(end + 1);
            line.truncate(end);
            frames.push(Frame(line.freeze()));
            from = 0;
        }
        self.scanned = self.buf.len();
        frames
    }

    /// Bytes received after the last newline.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial frame. Called whenever a new connection starts.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }
}

/// Result of one [`decode`] step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub frames: Vec<Frame>,
    pub pending: Vec<u8>,
}

/// Pure form of the decoder: `(pending, chunk) -> (frames, pending')`.
pub fn decode(pending: &[u8], chunk: &[u8]) -> Decoded {
    let mut decoder = FrameDecoder::with_pending(pending);
    let frames = decoder.feed(chunk);
    Decoded {
        frames,
        pending: decoder.pending().to_vec(),
    }
}
