//! Videohub wire protocol - framing, dispatch, block rendering
//!
//! The protocol is text, line-oriented: every message is a header line
//! (`HEADER:`) plus zero or more body lines, terminated by an empty line.
//! The server replies `ACK\n\n` or `NAK\n\n` and pushes state as blocks
//! with the same header + lines + blank-line shape.

pub mod dispatch;
pub mod framer;
pub mod render;

pub use dispatch::{process_message, ProcessStatus};
pub use framer::MessageFramer;

/// One framed message: a non-empty ordered sequence of text lines
pub type Message = Vec<String>;

/// Default Videohub control port
pub const DEFAULT_PORT: u16 = 9990;

/// Positive acknowledgement sent to the requester
pub const ACK: &str = "ACK\n\n";

/// Negative acknowledgement sent to the requester
pub const NAK: &str = "NAK\n\n";

// Command header prefixes (case-sensitive, matched through the colon)
pub const HEADER_PING: &str = "PING:";
pub const HEADER_DEVICE: &str = "VIDEOHUB DEVICE:";
pub const HEADER_INPUT_LABELS: &str = "INPUT LABELS:";
pub const HEADER_OUTPUT_LABELS: &str = "OUTPUT LABELS:";
pub const HEADER_ROUTING: &str = "VIDEO OUTPUT ROUTING:";
pub const HEADER_LOCKS: &str = "VIDEO OUTPUT LOCKS:";

/// Body label that selects the friendly-name mutation in a device message
pub const FRIENDLY_NAME_LABEL: &str = "Friendly name:";

/// Decode wire bytes as Latin-1
///
/// The wire text is ASCII/Latin-1, not UTF-8: every byte maps 1:1 to the
/// Unicode code point of the same value, so high bytes in labels survive
/// the round trip.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode text back to Latin-1 wire bytes
///
/// Code points above U+00FF cannot appear on the wire and degrade to `?`.
pub fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_round_trip() {
        let wire = b"0 Caf\xe9 \xdcberwachung";
        let text = decode_latin1(wire);
        assert_eq!(text, "0 Café Überwachung");
        assert_eq!(encode_latin1(&text), wire);
    }

    #[test]
    fn test_encode_replaces_unmappable_chars() {
        assert_eq!(encode_latin1("ok \u{2713}"), b"ok ?");
    }
}

