//! Message body transparency (RFC 5321 section 4.5.2).

use bytes::{BufMut, BytesMut};

/// End-of-data marker written after the last body line.
pub const DATA_TERMINATOR: &[u8] = b".\r\n";

/// Prepares a message for transmission after `DATA`.
///
/// Line endings are normalized to CRLF, every line that starts with `.` gets
/// a second `.`, the body is closed with a CRLF if it lacks one, and the
/// `.` terminator line is appended.
#[must_use]
pub fn encode_data(message: &[u8]) -> BytesMut {
    let mut out = BytesMut::with_capacity(message.len() + message.len() / 64 + 8);
    let mut at_line_start = true;
    let mut i = 0;

    while i < message.len() {
        let byte = message[i];
        if at_line_start && byte == b'.' {
            out.put_u8(b'.');
        }

        match byte {
            b'\r' if message.get(i + 1) == Some(&b'\n') => {
                out.put_slice(b"\r\n");
                at_line_start = true;
                i += 2;
                continue;
            }
            b'\n' => {
                out.put_slice(b"\r\n");
                at_line_start = true;
            }
            _ => {
                out.put_u8(byte);
                at_line_start = false;
            }
        }
        i += 1;
    }

    if !at_line_start {
        out.put_slice(b"\r\n");
    }
    out.put_slice(DATA_TERMINATOR);
    out
}

/// Returns true if the bytes need an 8-bit clean transport.
#[must_use]
pub fn is_8bit(message: &[u8]) -> bool {
    !message.is_ascii()
}
