//! MIME entities: leaf parts and multipart containers.

use std::fmt;

use crate::attachment::Attachment;
use crate::content_type::ContentType;
use crate::encoding::{Charset, encode_base64, encode_parameter, encode_quoted_printable};
use crate::header::Headers;

/// Longest line a 7bit/8bit body may carry (RFC 5322 section 2.1.1).
const MAX_RAW_LINE: usize = 998;

/// Content-Transfer-Encoding of a leaf part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII, short lines.
    SevenBit,
    /// 8-bit data, short lines (needs 8BITMIME from the relay).
    EightBit,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Base64 encoding.
    Base64,
}

impl TransferEncoding {
    /// Picks the encoding for text content already converted to its charset.
    #[must_use]
    pub fn for_text(bytes: &[u8], allow_8bit: bool) -> Self {
        let has_long_line = bytes
            .split(|b| *b == b'\n')
            .any(|line| line.len() > MAX_RAW_LINE);

        if has_long_line {
            Self::QuotedPrintable
        } else if bytes.is_ascii() {
            Self::SevenBit
        } else if allow_8bit {
            Self::EightBit
        } else {
            Self::QuotedPrintable
        }
    }

    /// Applies the encoding, producing CRLF-terminated lines.
    #[must_use]
    pub fn encode(self, bytes: &[u8]) -> Vec<u8> {
        let mut out = match self {
            Self::SevenBit | Self::EightBit => normalize_line_endings(bytes),
            Self::QuotedPrintable => encode_quoted_printable(bytes).into_bytes(),
            Self::Base64 => encode_base64(bytes).into_bytes(),
        };
        if !out.is_empty() && !out.ends_with(b"\r\n") {
            out.extend_from_slice(b"\r\n");
        }
        out
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::QuotedPrintable => "quoted-printable",
            Self::Base64 => "base64",
        })
    }
}

fn normalize_line_endings(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 40);
    let mut lines = bytes.split(|b| *b == b'\n').peekable();
    while let Some(line) = lines.next() {
        out.extend_from_slice(line.strip_suffix(b"\r").unwrap_or(line));
        if lines.peek().is_some() {
            out.extend_from_slice(b"\r\n");
        }
    }
    out
}

/// Body of a MIME entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    /// Transfer-encoded content of a leaf part.
    Leaf(Vec<u8>),
    /// Child entities separated by `boundary`.
    Multipart {
        /// Boundary delimiter (without the leading `--`).
        boundary: String,
        /// Child parts in order.
        parts: Vec<Part>,
    },
}

/// A MIME entity with its own headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers (Content-Type, Content-Transfer-Encoding, ...).
    pub headers: Headers,
    /// Part body.
    pub body: PartBody,
}

impl Part {
    /// Builds a `text/<subtype>` leaf from already charset-encoded bytes.
    #[must_use]
    pub fn text(encoded: &[u8], sub_type: &str, charset: Charset, allow_8bit: bool) -> Self {
        let cte = TransferEncoding::for_text(encoded, allow_8bit);
        let mut headers = Headers::new();
        headers.add(
            "Content-Type",
            ContentType::text(sub_type, charset.name()).to_string(),
        );
        headers.add("Content-Transfer-Encoding", cte.to_string());

        Self {
            headers,
            body: PartBody::Leaf(cte.encode(encoded)),
        }
    }

    /// Builds a base64 leaf for an attachment.
    #[must_use]
    pub fn attachment(attachment: &Attachment) -> Self {
        let disposition = if attachment.is_inline() {
            "inline"
        } else {
            "attachment"
        };

        let mut headers = Headers::new();
        headers.add("Content-Type", attachment.content_type().to_string());
        headers.add("Content-Transfer-Encoding", TransferEncoding::Base64.to_string());
        headers.add(
            "Content-Disposition",
            format!(
                "{disposition}; {}",
                encode_parameter("filename", attachment.filename())
            ),
        );
        if let Some(cid) = attachment.content_id() {
            headers.add("Content-ID", format!("<{cid}>"));
        }

        Self {
            headers,
            body: PartBody::Leaf(TransferEncoding::Base64.encode(attachment.content())),
        }
    }

    /// Builds a `multipart/<subtype>` container.
    #[must_use]
    pub fn multipart(sub_type: &str, boundary: String, parts: Vec<Self>) -> Self {
        let mut headers = Headers::new();
        headers.add(
            "Content-Type",
            ContentType::multipart(sub_type, boundary.as_str()).to_string(),
        );

        Self {
            headers,
            body: PartBody::Multipart { boundary, parts },
        }
    }

    /// Parses the Content-Type header of this part.
    #[must_use]
    pub fn content_type(&self) -> Option<ContentType> {
        self.headers
            .get("Content-Type")
            .and_then(|value| ContentType::parse(value).ok())
    }

    /// Returns the child parts of a multipart entity (empty for leaves).
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match &self.body {
            PartBody::Multipart { parts, .. } => parts,
            PartBody::Leaf(_) => &[],
        }
    }

    /// Returns the encoded body of a leaf part.
    #[must_use]
    pub fn leaf_body(&self) -> Option<&[u8]> {
        match &self.body {
            PartBody::Leaf(bytes) => Some(bytes),
            PartBody::Multipart { .. } => None,
        }
    }

    /// Serializes headers, blank line and body.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        self.write_body(out);
    }

    /// Serializes the body only.
    pub fn write_body(&self, out: &mut Vec<u8>) {
        match &self.body {
            PartBody::Leaf(bytes) => out.extend_from_slice(bytes),
            PartBody::Multipart { boundary, parts } => {
                for part in parts {
                    out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                    part.write_to(out);
                }
                out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn utf8() -> Charset {
        Charset::for_label("utf-8").unwrap()
    }

    #[test]
    fn ascii_text_is_7bit() {
        let part = Part::text(b"Hello\nWorld", "plain", utf8(), false);
        assert_eq!(part.headers.get("Content-Transfer-Encoding"), Some("7bit"));
        assert_eq!(
            part.headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(part.leaf_body().unwrap(), b"Hello\r\nWorld\r\n");
    }

    #[test]
    fn non_ascii_text_is_quoted_printable_unless_8bit_allowed() {
        let bytes = "Grüße".as_bytes();
        assert_eq!(
            TransferEncoding::for_text(bytes, false),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(
            TransferEncoding::for_text(bytes, true),
            TransferEncoding::EightBit
        );
    }

    #[test]
    fn long_lines_force_quoted_printable() {
        let long = vec![b'a'; 1200];
        assert_eq!(
            TransferEncoding::for_text(&long, true),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn multipart_rendering() {
        let plain = Part::text(b"plain", "plain", utf8(), false);
        let html = Part::text(b"<b>html</b>", "html", utf8(), false);
        let part = Part::multipart("alternative", "XYZ".to_string(), vec![plain, html]);

        let mut out = Vec::new();
        part.write_body(&mut out);
        let rendered = String::from_utf8(out).unwrap();
        assert!(rendered.starts_with("--XYZ\r\nContent-Type: text/plain"));
        assert!(rendered.contains("\r\n--XYZ\r\nContent-Type: text/html"));
        assert!(rendered.ends_with("<b>html</b>\r\n--XYZ--\r\n"));
        assert_eq!(part.children().len(), 2);
        assert_eq!(
            part.content_type().unwrap().essence(),
            "multipart/alternative"
        );
    }
}
