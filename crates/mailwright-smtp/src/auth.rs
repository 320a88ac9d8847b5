//! SASL mechanism negotiation.
//!
//! Only `PLAIN` and `LOGIN` are implemented. `PLAIN` wins when both are
//! offered; anything else is rejected before a command is sent.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::command::{Command, check_argument};
use crate::connection::SmtpClient;
use crate::error::{Error, Result};
use crate::types::{AuthMechanism, Reply};

/// Username and password for SMTP authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Picks the mechanism to use from the server's list.
#[must_use]
pub fn select_mechanism(offered: &[AuthMechanism]) -> Option<AuthMechanism> {
    [AuthMechanism::Plain, AuthMechanism::Login]
        .into_iter()
        .find(|mechanism| offered.contains(mechanism))
}

/// Builds the single AUTH command for `mechanism`.
///
/// # Errors
///
/// Returns [`Error::AuthUnsupported`] for mechanisms we do not implement,
/// and [`Error::InvalidArgument`] for credentials the mechanism cannot carry:
/// NUL for PLAIN, whitespace or control characters for the one-line LOGIN
/// form.
pub fn auth_command(mechanism: &AuthMechanism, credentials: &Credentials) -> Result<Command> {
    let arguments = match mechanism {
        AuthMechanism::Plain => {
            if credentials.username.contains('\0') || credentials.password.contains('\0') {
                return Err(Error::InvalidArgument(
                    "PLAIN credentials cannot contain NUL".to_string(),
                ));
            }
            let token = format!("\0{}\0{}", credentials.username, credentials.password);
            vec![STANDARD.encode(token.as_bytes())]
        }
        AuthMechanism::Login => {
            check_argument("LOGIN username", &credentials.username)?;
            check_argument("LOGIN password", &credentials.password)?;
            vec![credentials.username.clone(), credentials.password.clone()]
        }
        AuthMechanism::Other(_) => return Err(Error::AuthUnsupported),
    };

    Ok(Command::Auth {
        mechanism: mechanism.clone(),
        arguments,
    })
}

/// Authenticates `client` with the best mechanism from `mechanisms`.
///
/// # Errors
///
/// Returns [`Error::AuthUnsupported`] when neither PLAIN nor LOGIN is
/// offered (nothing is sent in that case), or the server's rejection as
/// [`Error::Reply`].
pub async fn authenticate<S>(
    client: &mut SmtpClient<S>,
    mechanisms: &[AuthMechanism],
    credentials: &Credentials,
) -> Result<Reply>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mechanism = select_mechanism(mechanisms).ok_or(Error::AuthUnsupported)?;
    let command = auth_command(&mechanism, credentials)?;
    client.send_auth(&command).await
}
