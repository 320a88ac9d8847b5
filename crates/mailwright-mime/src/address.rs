//! Mailbox addresses as they appear in From/To/Cc/Bcc headers.

use std::fmt;
use std::str::FromStr;

use crate::encoding::{encode_rfc2047, needs_header_encoding};
use crate::error::{Error, Result};

/// RFC 5322 `specials` that force a display name into a quoted string.
const SPECIALS: &str = "()<>[]:;@\\,.\"";

/// An email address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Address {
    name: Option<String>,
    email: String,
}

impl Address {
    /// Creates an address from a bare `local@domain` mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the mailbox is malformed.
    pub fn new(email: impl Into<String>) -> Result<Self> {
        let email = email.into();
        validate_mailbox(&email)?;
        Ok(Self { name: None, email })
    }

    /// Creates an address with a display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the mailbox is malformed.
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let mut address = Self::new(email)?;
        let name = name.into();
        if name.contains(['\r', '\n']) {
            return Err(Error::InvalidAddress(format!(
                "display name contains a line break: {name:?}"
            )));
        }
        address.name = Some(name).filter(|n| !n.trim().is_empty());
        Ok(address)
    }

    /// Parses `user@host` or `Display Name <user@host>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] on syntax errors.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(open) = s.rfind('<') {
            let Some(inner) = s[open + 1..].strip_suffix('>') else {
                return Err(Error::InvalidAddress(format!("unterminated angle address: {s}")));
            };
            let name = unquote(s[..open].trim());
            return Self::with_name(name, inner.trim());
        }
        Self::new(s)
    }

    /// Parses a comma separated address list.
    ///
    /// Commas inside quoted display names or angle brackets do not split.
    ///
    /// # Errors
    ///
    /// Returns the first address that fails to parse.
    pub fn parse_list(s: &str) -> Result<Vec<Self>> {
        let mut addresses = Vec::new();
        let mut in_quotes = false;
        let mut in_angle = false;
        let mut escaped = false;
        let mut start = 0;

        for (idx, ch) in s.char_indices() {
            match ch {
                _ if escaped => escaped = false,
                '\\' if in_quotes => escaped = true,
                '"' => in_quotes = !in_quotes,
                '<' if !in_quotes => in_angle = true,
                '>' if !in_quotes => in_angle = false,
                ',' if !in_quotes && !in_angle => {
                    push_entry(&mut addresses, &s[start..idx])?;
                    start = idx + 1;
                }
                _ => {}
            }
        }
        push_entry(&mut addresses, &s[start..])?;
        Ok(addresses)
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the `local@domain` part.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.email.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    /// Renders the address for a header, RFC 2047 encoding a non-ASCII name.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        match &self.name {
            Some(name) if needs_header_encoding(name) => {
                format!("{} <{}>", encode_rfc2047(name), self.email)
            }
            _ => self.to_string(),
        }
    }
}

fn push_entry(addresses: &mut Vec<Address>, entry: &str) -> Result<()> {
    if !entry.trim().is_empty() {
        addresses.push(Address::parse(entry)?);
    }
    Ok(())
}

fn unquote(name: &str) -> String {
    name.strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .map_or_else(
            || name.to_string(),
            |inner| inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        )
}

fn validate_mailbox(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(Error::InvalidAddress("address cannot be empty".into()));
    }

    if email
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | ','))
    {
        return Err(Error::InvalidAddress(format!(
            "address contains forbidden characters: {email:?}"
        )));
    }

    // Mailboxes end up as sendmail arguments.
    if email.starts_with('-') {
        return Err(Error::InvalidAddress(format!(
            "address cannot start with '-': {email:?}"
        )));
    }

    match email.rsplit_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(())
        }
        _ => Err(Error::InvalidAddress(format!(
            "expected local@domain, got {email:?}"
        ))),
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            None => f.write_str(&self.email),
            Some(name) if name.contains(|c: char| SPECIALS.contains(c)) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.email)
            }
            Some(name) => write!(f, "{name} <{}>", self.email),
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl TryFrom<&str> for Address {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_mailbox() {
        let addr = Address::parse("user@example.com").unwrap();
        assert_eq!(addr.email(), "user@example.com");
        assert_eq!(addr.name(), None);
        assert_eq!(addr.domain(), "example.com");
    }

    #[test]
    fn parses_display_name() {
        let addr = Address::parse("Alice Example <alice@example.com>").unwrap();
        assert_eq!(addr.name(), Some("Alice Example"));
        assert_eq!(addr.email(), "alice@example.com");
        assert_eq!(addr.to_string(), "Alice Example <alice@example.com>");
    }

    #[test]
    fn parses_quoted_display_name() {
        let addr = Address::parse("\"Example, Alice\" <alice@example.com>").unwrap();
        assert_eq!(addr.name(), Some("Example, Alice"));
        assert_eq!(addr.to_string(), "\"Example, Alice\" <alice@example.com>");
    }

    #[test]
    fn empty_name_is_dropped() {
        let addr = Address::parse("<bob@example.com>").unwrap();
        assert_eq!(addr.name(), None);
        assert_eq!(addr.to_string(), "bob@example.com");
    }

    #[test]
    fn rejects_invalid_syntax() {
        for bad in [
            "",
            "no-at-sign",
            "@example.com",
            "user@",
            "two words@example.com",
            "Name <user@example.com",
            "user@.example.com",
            "a@b.com\r\nBcc: evil@x.com",
            "-oQ/tmp@example.com",
            "Name <-f@example.com>",
        ] {
            assert!(
                matches!(Address::parse(bad), Err(Error::InvalidAddress(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn parses_list() {
        let list =
            Address::parse_list("a@example.com, \"Doe, John\" <john@example.com>,b@example.com")
                .unwrap();
        let emails: Vec<&str> = list.iter().map(Address::email).collect();
        assert_eq!(emails, vec!["a@example.com", "john@example.com", "b@example.com"]);
        assert_eq!(list[1].name(), Some("Doe, John"));
    }

    #[test]
    fn empty_list_entries_skipped() {
        assert!(Address::parse_list("  ").unwrap().is_empty());
        assert_eq!(Address::parse_list("a@example.com,").unwrap().len(), 1);
    }

    #[test]
    fn header_value_encodes_non_ascii_name() {
        let addr = Address::with_name("Jürgen", "j@example.com").unwrap();
        assert_eq!(addr.to_header_value(), "=?utf-8?B?SsO8cmdlbg==?= <j@example.com>");
        assert_eq!(addr.to_string(), "Jürgen <j@example.com>");
    }

    #[test]
    fn from_str_and_into_string() {
        let addr: Address = "Bob <bob@example.com>".parse().unwrap();
        let s: String = addr.into();
        assert_eq!(s, "Bob <bob@example.com>");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_header_form() {
        let addr = Address::parse("Bob <bob@example.com>").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"Bob <bob@example.com>\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<Address>("\"not an address\"").is_err());
    }
}
