//! Error types for SMTP operations.

use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Host name cannot be used for TLS server name verification.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// The connection could not be established (DNS, refusal, timeout, handshake).
    #[error("Error connecting to {host} on port {port}: {source}")]
    Connect {
        /// Host we tried to reach.
        host: String,
        /// Port we tried to reach.
        port: u16,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// A read or write did not complete in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Server returned an error reply (code >= 400).
    #[error("SMTP error {code}: {text}")]
    Reply {
        /// Reply code (e.g., 550).
        code: u16,
        /// Reply text, continuation lines joined with `\n`.
        text: String,
    },

    /// A reply line did not start with three digits and a separator.
    #[error("Malformed response from server: {0:?}")]
    MalformedResponse(String),

    /// The server closed the connection before a complete reply line arrived.
    #[error("Server closed connection")]
    ConnectionClosed,

    /// None of the advertised SASL mechanisms is one we implement.
    #[error("server does not support any of our authentication methods")]
    AuthUnsupported,

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Message is larger than the server's advertised SIZE limit.
    #[error("Message exceeds size limit: {size} bytes (server accepts at most {limit})")]
    MessageTooLarge {
        /// Size of the message in bytes.
        size: usize,
        /// Limit advertised by the server.
        limit: usize,
    },

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// A value cannot be placed on a command line.
    #[error("Invalid command argument: {0}")]
    InvalidArgument(String),

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates a reply error from a code and server text.
    #[must_use]
    pub fn reply(code: u16, text: impl Into<String>) -> Self {
        Self::Reply {
            code,
            text: text.into(),
        }
    }

    /// Returns the SMTP reply code if this error came from a server reply.
    #[must_use]
    pub const fn reply_code(&self) -> Option<u16> {
        match self {
            Self::Reply { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Reply { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Reply { code, .. } if *code >= 400 && *code < 500)
    }

    /// Returns true if the connection can no longer carry commands after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Tls(_)
                | Self::Connect { .. }
                | Self::Timeout(_)
                | Self::MalformedResponse(_)
                | Self::ConnectionClosed
        )
    }
}
