//! Transfer and header encodings.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 header encoding and RFC 2231
//! parameter encoding, plus charset conversion through `encoding_rs`.

use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use encoding_rs::Encoding;

use crate::error::{Error, Result};

/// Maximum encoded line length (RFC 2045 section 6.7/6.8).
const MAX_LINE_LENGTH: usize = 76;

/// Longest run of raw bytes carried by one RFC 2047 encoded-word
/// (`=?utf-8?B?` + 60 base64 chars + `?=` = 72 <= 75).
const ENCODED_WORD_BYTES: usize = 45;

/// Encodes data as Base64 with CRLF-terminated 76-column lines.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);

    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % MAX_LINE_LENGTH == 0 {
            out.push_str("\r\n");
        }
        out.push(c);
    }
    if !encoded.is_empty() {
        out.push_str("\r\n");
    }
    out
}

/// Encodes bytes using Quoted-Printable encoding (RFC 2045).
///
/// Input line breaks (LF or CRLF) become hard CRLF breaks; long lines get
/// `=` soft breaks. Whitespace at the end of a line is always escaped.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + data.len() / 2);
    let mut lines = data.split(|b| *b == b'\n').peekable();

    while let Some(line) = lines.next() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        encode_qp_line(line, &mut out);
        if lines.peek().is_some() {
            out.push_str("\r\n");
        }
    }
    out
}

fn encode_qp_line(line: &[u8], out: &mut String) {
    let mut column = 0;

    for (i, &byte) in line.iter().enumerate() {
        let is_last = i + 1 == line.len();
        let literal = matches!(byte, b'!'..=b'<' | b'>'..=b'~')
            || (matches!(byte, b' ' | b'\t') && !is_last);
        let width = if literal { 1 } else { 3 };

        // Leave room for the trailing '=' of a soft break.
        if column + width > MAX_LINE_LENGTH - 1 {
            out.push_str("=\r\n");
            column = 0;
        }

        if literal {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "={byte:02X}");
        }
        column += width;
    }
}

/// Returns true if a header value must be RFC 2047 encoded.
#[must_use]
pub fn needs_header_encoding(text: &str) -> bool {
    !text.is_ascii() || text.chars().any(|c| c.is_ascii_control()) || text.contains("=?")
}

/// Encodes header text as UTF-8 RFC 2047 encoded-words where necessary.
///
/// Words are at most 75 characters and separated by single spaces, so the
/// header folder may break between them.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if !needs_header_encoding(text) {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut chunk_start = 0;
    let mut chunk_len = 0;

    for (idx, ch) in text.char_indices() {
        let len = ch.len_utf8();
        if chunk_len + len > ENCODED_WORD_BYTES {
            words.push(encoded_word(&text[chunk_start..idx]));
            chunk_start = idx;
            chunk_len = 0;
        }
        chunk_len += len;
    }
    words.push(encoded_word(&text[chunk_start..]));

    words.join(" ")
}

fn encoded_word(chunk: &str) -> String {
    format!("=?utf-8?B?{}?=", STANDARD.encode(chunk.as_bytes()))
}

/// Encodes a MIME parameter per RFC 2231 when it is not plain ASCII.
///
/// Returns `name="value"` for ASCII values and `name*=utf-8''pct-encoded` otherwise.
#[must_use]
pub fn encode_parameter(name: &str, value: &str) -> String {
    if value.is_ascii() && !value.chars().any(|c| c.is_ascii_control()) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        return format!("{name}=\"{escaped}\"");
    }

    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    format!("{name}*=utf-8''{encoded}")
}

/// A charset resolved through `encoding_rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    encoding: &'static Encoding,
}

impl Charset {
    /// Looks up a charset label (`utf-8`, `latin1`, `iso-8859-15`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCharset`] for labels the WHATWG Encoding
    /// Standard does not know.
    pub fn for_label(label: &str) -> Result<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(|encoding| Self {
                encoding: encoding.output_encoding(),
            })
            .ok_or_else(|| Error::UnknownCharset(label.to_string()))
    }

    /// Canonical name used in `charset=` parameters.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self.encoding.name() {
            "UTF-8" => "utf-8",
            other => other,
        }
    }

    /// Encodes `text`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unencodable`] if a character has no representation
    /// in this charset.
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        let (bytes, _, had_errors) = self.encoding.encode(text);
        if had_errors {
            return Err(Error::Unencodable(self.name().to_string()));
        }
        Ok(bytes.into_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_wraps_at_76_columns() {
        let data = vec![b'x'; 200];
        let encoded = encode_base64(&data);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert!(lines[..lines.len() - 1].iter().all(|l| l.len() <= 76));
        assert_eq!(lines[0].len(), 76);
        assert!(encoded.ends_with("\r\n"));

        let joined: String = lines.concat();
        assert_eq!(STANDARD.decode(joined).unwrap(), data);
    }

    #[test]
    fn test_base64_empty() {
        assert_eq!(encode_base64(b""), "");
    }

    #[test]
    fn test_quoted_printable_ascii_passthrough() {
        assert_eq!(encode_quoted_printable(b"Hello, World!"), "Hello, World!");
    }

    #[test]
    fn test_quoted_printable_escapes() {
        let encoded = encode_quoted_printable("Héllo a=b".as_bytes());
        assert_eq!(encoded, "H=C3=A9llo a=3Db");
    }

    #[test]
    fn test_quoted_printable_hard_line_breaks() {
        let encoded = encode_quoted_printable(b"one\ntwo\r\nthree trailing \n");
        assert_eq!(encoded, "one\r\ntwo\r\nthree trailing=20\r\n");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let long = "é".repeat(40);
        let encoded = encode_quoted_printable(long.as_bytes());
        for line in encoded.split("\r\n") {
            assert!(line.len() <= 76, "line too long: {line}");
        }
        assert!(encoded.contains("=\r\n"));
    }

    #[test]
    fn test_rfc2047_plain_ascii_untouched() {
        assert_eq!(encode_rfc2047("Hello"), "Hello");
    }

    #[test]
    fn test_rfc2047_encodes_non_ascii() {
        assert_eq!(encode_rfc2047("Héllo"), "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_rfc2047_splits_long_text_on_char_boundaries() {
        let subject = "Grüße aus Köln, ".repeat(8);
        let encoded = encode_rfc2047(&subject);
        let words: Vec<&str> = encoded.split(' ').collect();
        assert!(words.len() > 1);

        let mut decoded = Vec::new();
        for word in words {
            assert!(word.len() <= 75);
            let inner = word
                .strip_prefix("=?utf-8?B?")
                .and_then(|w| w.strip_suffix("?="))
                .unwrap();
            let bytes = STANDARD.decode(inner).unwrap();
            // Each word must be valid UTF-8 by itself.
            assert!(std::str::from_utf8(&bytes).is_ok());
            decoded.extend(bytes);
        }
        assert_eq!(String::from_utf8(decoded).unwrap(), subject);
    }

    #[test]
    fn test_parameter_encoding() {
        assert_eq!(encode_parameter("filename", "a.txt"), "filename=\"a.txt\"");
        assert_eq!(
            encode_parameter("filename", "say \"hi\".txt"),
            "filename=\"say \\\"hi\\\".txt\""
        );
        assert_eq!(
            encode_parameter("filename", "résumé.pdf"),
            "filename*=utf-8''r%C3%A9sum%C3%A9.pdf"
        );
    }

    #[test]
    fn test_charset_lookup() {
        assert_eq!(Charset::for_label("utf-8").unwrap().name(), "utf-8");
        assert_eq!(Charset::for_label("UTF8").unwrap().name(), "utf-8");
        assert_eq!(Charset::for_label("latin1").unwrap().name(), "windows-1252");
        assert!(matches!(
            Charset::for_label("klingon"),
            Err(Error::UnknownCharset(_))
        ));
    }

    #[test]
    fn test_charset_encode() {
        let latin = Charset::for_label("iso-8859-15").unwrap();
        assert_eq!(latin.encode("é").unwrap(), vec![0xE9]);
        assert!(matches!(latin.encode("日本"), Err(Error::Unencodable(_))));
    }

    proptest! {
        #[test]
        fn quoted_printable_lines_fit(data in proptest::collection::vec(any::<u8>(), 0..600)) {
            let encoded = encode_quoted_printable(&data);
            prop_assert!(encoded.is_ascii());
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= 76, "line too long: {line:?}");
                prop_assert!(!line.ends_with(' ') && !line.ends_with('\t'));
            }
        }

        #[test]
        fn encoded_words_stay_short(text in "\\PC{0,120}") {
            for word in encode_rfc2047(&text).split(' ') {
                prop_assert!(word.len() <= 75 || !needs_header_encoding(&text));
            }
        }
    }
}
