//! SMTP connection management.

mod client;
mod framed;
mod state;
mod stream;

pub use client::SmtpClient;
pub use framed::FramedStream;
pub use state::SessionState;
pub use stream::{SmtpStream, connect, default_tls_config};

use crate::types::{AuthMechanism, Extension, Reply};

/// Server capabilities from the EHLO response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server hostname, first word of the greeting or EHLO reply.
    pub hostname: String,
    /// Advertised extensions, in the order the server listed them.
    pub extensions: Vec<Extension>,
}

impl ServerInfo {
    /// Builds server information from an EHLO reply.
    ///
    /// The first line is the server's greeting; every following line is an
    /// extension keyword with optional parameters.
    #[must_use]
    pub fn from_ehlo(reply: &Reply) -> Self {
        let hostname = reply
            .lines
            .first()
            .and_then(|line| line.split_whitespace().next())
            .unwrap_or_default()
            .to_string();

        let extensions = reply
            .lines
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();

        Self {
            hostname,
            extensions,
        }
    }

    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Checks if command pipelining is supported.
    #[must_use]
    pub fn supports_pipelining(&self) -> bool {
        self.supports(&Extension::Pipelining)
    }

    /// Checks if 8-bit message content is accepted.
    #[must_use]
    pub fn supports_8bitmime(&self) -> bool {
        self.supports(&Extension::EightBitMime)
    }

    /// Checks if the SIZE extension is advertised, with or without a limit.
    #[must_use]
    pub fn supports_size(&self) -> bool {
        self.extensions.iter().any(|ext| matches!(ext, Extension::Size(_)))
    }

    /// Returns the maximum message size, if advertised (`SIZE 0` means no limit).
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(Some(size)) if *size > 0 => Some(*size),
            _ => None,
        })
    }

    /// Returns supported authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> &[AuthMechanism] {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }
}
