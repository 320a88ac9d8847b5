//! SMTP command builder.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::types::{Address, AuthMechanism};

/// SMTP command.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Authenticate with the given mechanism
    Auth {
        /// Authentication mechanism
        mechanism: AuthMechanism,
        /// Arguments sent on the same line (initial response, or LOGIN credentials)
        arguments: Vec<String>,
    },
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
        /// BODY parameter (8BITMIME)
        body: Option<String>,
        /// SIZE parameter
        size: Option<usize>,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// RSET - Reset transaction
    Rset,
    /// NOOP - No operation
    Noop,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Returns the command verb.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth { .. } => "AUTH",
            Self::MailFrom { .. } => "MAIL",
            Self::RcptTo { .. } => "RCPT",
            Self::Data => "DATA",
            Self::Rset => "RSET",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
        }
    }

    /// Appends the wire form of the command, CRLF included, to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Self::Ehlo { hostname } => {
                buf.put_slice(b"EHLO ");
                buf.put_slice(hostname.as_bytes());
            }
            Self::Auth {
                mechanism,
                arguments,
            } => {
                buf.put_slice(b"AUTH ");
                buf.put_slice(mechanism.as_str().as_bytes());
                for arg in arguments {
                    buf.put_u8(b' ');
                    buf.put_slice(arg.as_bytes());
                }
            }
            Self::MailFrom { from, body, size } => {
                buf.put_slice(b"MAIL FROM:<");
                buf.put_slice(from.as_str().as_bytes());
                buf.put_u8(b'>');
                if let Some(body_type) = body {
                    buf.put_slice(b" BODY=");
                    buf.put_slice(body_type.as_bytes());
                }
                if let Some(msg_size) = size {
                    buf.put_slice(format!(" SIZE={msg_size}").as_bytes());
                }
            }
            Self::RcptTo { to } => {
                buf.put_slice(b"RCPT TO:<");
                buf.put_slice(to.as_str().as_bytes());
                buf.put_u8(b'>');
            }
            Self::StartTls | Self::Data | Self::Rset | Self::Noop | Self::Quit => {
                buf.put_slice(self.verb().as_bytes());
            }
        }

        buf.put_slice(b"\r\n");
    }

    /// Serializes the command to bytes.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.to_vec()
    }
}

/// Checks that `value` can go on a command line as one argument.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `value` is empty or contains
/// whitespace or control characters.
pub fn check_argument(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{what} cannot be empty")));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidArgument(format!(
            "{what} contains whitespace or control characters"
        )));
    }
    Ok(())
}

/// Log-safe rendering: AUTH arguments are replaced with `<redacted>`.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth {
                mechanism,
                arguments,
            } => {
                write!(f, "AUTH {mechanism}")?;
                if !arguments.is_empty() {
                    f.write_str(" <redacted>")?;
                }
                Ok(())
            }
            other => {
                let wire = other.serialize();
                f.write_str(String::from_utf8_lossy(&wire).trim_end())
            }
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command({self})")
    }
}
