//! Error types for mail dispatch.

use mailwright_mime::Message;
use thiserror::Error;

/// Errors that can occur while configuring mailers or delivering mail.
#[derive(Debug, Error)]
pub enum Error {
    /// SMTP protocol or transport failure.
    #[error(transparent)]
    Smtp(#[from] mailwright_smtp::Error),

    /// Message construction failed.
    #[error(transparent)]
    Mime(#[from] mailwright_mime::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The sendmail executable exited with an error; holds its stderr output.
    #[error("{0}")]
    Sendmail(String),

    /// No backend is registered under this name.
    #[error("Unknown mailer backend: {0:?}")]
    UnknownBackend(String),
}

impl Error {
    /// Returns the SMTP reply code if the server rejected a command.
    #[must_use]
    pub const fn reply_code(&self) -> Option<u16> {
        match self {
            Self::Smtp(err) => err.reply_code(),
            _ => None,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A failed delivery, with the message that could not be sent when one is
/// known.
#[derive(Debug, Error)]
#[error("error sending mail message: {error}")]
pub struct DeliveryError {
    #[source]
    error: Error,
    message: Option<Box<Message>>,
}

impl DeliveryError {
    /// Creates a delivery error, optionally attached to a message.
    #[must_use]
    pub fn new(error: impl Into<Error>, message: Option<Message>) -> Self {
        Self {
            error: error.into(),
            message: message.map(Box::new),
        }
    }

    /// The underlying cause.
    #[must_use]
    pub const fn error(&self) -> &Error {
        &self.error
    }

    /// The message whose delivery failed.
    #[must_use]
    pub fn message(&self) -> Option<&Message> {
        self.message.as_deref()
    }

    /// Takes the failed message back, e.g. to queue it again.
    #[must_use]
    pub fn into_message(self) -> Option<Message> {
        self.message.map(|message| *message)
    }

    /// Splits the error into its cause and message.
    #[must_use]
    pub fn into_parts(self) -> (Error, Option<Message>) {
        (self.error, self.message.map(|message| *message))
    }

    /// SMTP reply code of the rejection, if the server sent one.
    #[must_use]
    pub const fn reply_code(&self) -> Option<u16> {
        self.error.reply_code()
    }
}

impl From<Error> for DeliveryError {
    fn from(error: Error) -> Self {
        Self {
            error,
            message: None,
        }
    }
}

impl From<mailwright_smtp::Error> for DeliveryError {
    fn from(error: mailwright_smtp::Error) -> Self {
        Error::from(error).into()
    }
}

impl From<mailwright_mime::Error> for DeliveryError {
    fn from(error: mailwright_mime::Error) -> Self {
        Error::from(error).into()
    }
}
