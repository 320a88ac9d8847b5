//! Session state of an SMTP connection.

use std::fmt;

/// Where an SMTP session stands (RFC 5321 section 4.1.4 ordering).
///
/// Legal transitions:
/// - `Unconnected` → `Greeted` (220 greeting read)
/// - `Greeted` → `FeaturesKnown` (EHLO accepted)
/// - `FeaturesKnown` → `Greeted` (STARTTLS handshake done, EHLO must be repeated)
/// - `FeaturesKnown` → `Authenticated` (AUTH accepted)
/// - `FeaturesKnown | Authenticated` → `InTransaction` (MAIL FROM sent)
/// - `InTransaction` → `Data` (354 received)
/// - `Data` → `FeaturesKnown | Authenticated` (end of data acknowledged)
/// - any → `Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Transport open, greeting not read yet.
    #[default]
    Unconnected,
    /// Greeting received.
    Greeted,
    /// EHLO accepted, extensions known.
    FeaturesKnown,
    /// AUTH accepted.
    Authenticated,
    /// Inside a mail transaction (between MAIL FROM and DATA).
    InTransaction,
    /// Server is reading message content.
    Data,
    /// QUIT sent or transport shut down.
    Closed,
}

impl SessionState {
    /// Returns true if a new mail transaction may start.
    #[must_use]
    pub const fn can_start_transaction(self) -> bool {
        matches!(self, Self::FeaturesKnown | Self::Authenticated)
    }

    /// Returns true if EHLO may be sent.
    #[must_use]
    pub const fn can_ehlo(self) -> bool {
        matches!(self, Self::Greeted | Self::FeaturesKnown)
    }

    /// Returns true if a polite QUIT can still be exchanged.
    #[must_use]
    pub const fn accepts_quit(self) -> bool {
        !matches!(self, Self::Unconnected | Self::Data | Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unconnected => "unconnected",
            Self::Greeted => "greeted",
            Self::FeaturesKnown => "features known",
            Self::Authenticated => "authenticated",
            Self::InTransaction => "in transaction",
            Self::Data => "data",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
