//! Incremental byte-to-frame decoding.
//!
//! Owns the text buffer a stream session feeds chunks into. Bytes are
//! decoded as UTF-8 with incomplete trailing sequences held back, so a
//! multi-byte character split across reads decodes correctly.

use crate::sse::{parse_resuming, StreamFrame};

/// Growable buffer between the byte stream and the frame parser.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Decoded text not yet consumed by the parser
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending: Vec<u8>,
    /// Event type waiting for its `data:` line
    pending_event: Option<String>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.pending.extend_from_slice(chunk);
        self.decode_pending();
        self.drain()
    }

    /// Flush at end of stream.
    ///
    /// A final line without its terminator is treated as terminated, and an
    /// incomplete UTF-8 tail is replaced with U+FFFD.
    pub fn finish(&mut self) -> Vec<StreamFrame> {
        if !self.pending.is_empty() {
            self.buffer
                .push_str(&String::from_utf8_lossy(&std::mem::take(&mut self.pending)));
        }
        if self.buffer.is_empty() {
            self.pending_event = None;
            return Vec::new();
        }
        self.buffer.push('\n');
        let frames = self.drain();
        self.buffer.clear();
        self.pending_event = None;
        frames
    }

    /// Text currently held back: the trailing partial line.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Event type seen without its `data:` line yet.
    pub fn pending_event(&self) -> Option<&str> {
        self.pending_event.as_deref()
    }

    fn decode_pending(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    // valid_up_to always lands on a char boundary
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // incomplete sequence at the end: wait for more bytes
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                        Some(bad) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                    }
                }
            }
        }
    }

    fn drain(&mut self) -> Vec<StreamFrame> {
        let output = parse_resuming(self.pending_event.take(), &self.buffer);
        self.buffer = output.remainder;
        self.pending_event = output.pending_event;
        output.frames
    }
}
