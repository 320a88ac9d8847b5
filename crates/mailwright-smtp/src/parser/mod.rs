//! SMTP response parser.
//!
//! Replies arrive one CRLF-terminated line at a time:
//! - Single: `250 OK\r\n`
//! - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
//!
//! [`ReplyAssembler`] folds lines into complete [`Reply`] values so the
//! connection layer never has to look at separators itself.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// One parsed reply line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyLine<'a> {
    /// Three-digit reply code.
    pub code: u16,
    /// `true` for `NNN text`, `false` for `NNN-text`.
    pub is_last: bool,
    /// Text after the separator.
    pub text: &'a str,
}

/// Parses a single reply line (CRLF already stripped).
///
/// The line must match `^\d{3}[ -]`.
///
/// # Errors
///
/// Returns [`Error::MalformedResponse`] for anything else.
pub fn parse_line(line: &str) -> Result<ReplyLine<'_>> {
    let bytes = line.as_bytes();
    if bytes.len() < 4 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(Error::MalformedResponse(line.to_string()));
    }

    let is_last = match bytes[3] {
        b' ' => true,
        b'-' => false,
        _ => return Err(Error::MalformedResponse(line.to_string())),
    };

    let code = line[..3]
        .parse::<u16>()
        .map_err(|_| Error::MalformedResponse(line.to_string()))?;

    Ok(ReplyLine {
        code,
        is_last,
        text: &line[4..],
    })
}

/// Accumulates reply lines until a terminating line completes the reply.
#[derive(Debug, Default)]
pub struct ReplyAssembler {
    lines: Vec<String>,
}

impl ReplyAssembler {
    /// Creates an empty assembler.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Feeds one line. Returns the finished reply once the last line arrives.
    ///
    /// The code of the terminating line is the code of the reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] if the line is not a reply line.
    pub fn push(&mut self, line: &str) -> Result<Option<Reply>> {
        let parsed = parse_line(line)?;
        self.lines.push(parsed.text.to_string());

        if parsed.is_last {
            let lines = std::mem::take(&mut self.lines);
            Ok(Some(Reply::new(ReplyCode::new(parsed.code), lines)))
        } else {
            Ok(None)
        }
    }

    /// Returns true if some continuation lines have been seen.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.lines.is_empty()
    }
}
