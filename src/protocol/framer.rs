//! Incremental message framer
//!
//! Turns one connection's append-only byte stream into discrete messages.
//! The framer owns whatever partial line or partial message the last read
//! left behind, so an arbitrary split of the stream across reads produces
//! the same message sequence as a single read.

use super::Message;

/// Per-connection framer state
///
/// `push` accepts a chunk of bytes and returns every message the chunk
/// completed, in arrival order. A message is terminated by an empty line
/// (after stripping a single trailing carriage return); an empty line with
/// no accumulated lines is absorbed. Dropping the framer discards any
/// unterminated partial message, which is the required close behavior.
#[derive(Debug, Default)]
pub struct MessageFramer {
    /// Bytes of the current, not-yet-terminated line
    line_buf: Vec<u8>,
    /// Complete lines of the current, not-yet-terminated message
    lines: Vec<String>,
}

impl MessageFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk of the stream, returning completed messages
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Message> {
        let mut complete = Vec::new();

        for &byte in chunk {
            if byte != b'\n' {
                self.line_buf.push(byte);
                continue;
            }

            let mut line = std::mem::take(&mut self.line_buf);
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if line.is_empty() {
                // Terminator. With no accumulated lines it is a stray blank
                // line and produces no message.
                if !self.lines.is_empty() {
                    complete.push(std::mem::take(&mut self.lines));
                }
            } else {
                self.lines.push(super::decode_latin1(&line));
            }
        }

        complete
    }
}
