//! The `Mailer` trait shared by all delivery backends.

use std::fmt;

use async_trait::async_trait;
use mailwright_mime::{Address, Message};

use crate::config::{MessageDefaults, Resources};
use crate::error::{DeliveryError, Result};

/// Fields for [`Mailer::create_message`]. Empty fields fall back to the
/// mailer's [`MessageDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFields {
    /// Subject line.
    pub subject: Option<String>,
    /// Sender shown in the From header.
    pub sender: Option<Address>,
    /// Primary recipients.
    pub to: Vec<Address>,
    /// Secondary recipients.
    pub cc: Vec<Address>,
    /// Hidden recipients.
    pub bcc: Vec<Address>,
    /// Charset for text bodies.
    pub charset: Option<String>,
    /// Plain text body.
    pub plain_body: Option<String>,
    /// HTML body.
    pub html_body: Option<String>,
}

impl MessageFields {
    /// Creates empty fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the sender.
    #[must_use]
    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Adds a To recipient.
    #[must_use]
    pub fn to(mut self, to: Address) -> Self {
        self.to.push(to);
        self
    }

    /// Adds a Cc recipient.
    #[must_use]
    pub fn cc(mut self, cc: Address) -> Self {
        self.cc.push(cc);
        self
    }

    /// Adds a Bcc recipient.
    #[must_use]
    pub fn bcc(mut self, bcc: Address) -> Self {
        self.bcc.push(bcc);
        self
    }

    /// Sets the charset.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn plain_body(mut self, body: impl Into<String>) -> Self {
        self.plain_body = Some(body.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }
}

fn or_default(given: Vec<Address>, default: &[Address]) -> Vec<Address> {
    if given.is_empty() {
        default.to_vec()
    } else {
        given
    }
}

/// A mail delivery backend.
///
/// Implementations only provide [`Mailer::deliver`] and
/// [`Mailer::message_defaults`]; message creation is shared.
#[async_trait]
pub trait Mailer: fmt::Debug + fmt::Display + Send + Sync {
    /// One-time setup, called before the first delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if a named resource cannot be resolved.
    async fn start(&mut self, _resources: &Resources) -> Result<()> {
        Ok(())
    }

    /// Defaults applied by [`Mailer::create_message`].
    fn message_defaults(&self) -> &MessageDefaults;

    /// Delivers messages in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] carrying the failed message when one was
    /// being sent.
    async fn deliver(&self, messages: Vec<Message>) -> std::result::Result<(), DeliveryError>;

    /// Delivers a single message.
    ///
    /// # Errors
    ///
    /// See [`Mailer::deliver`].
    async fn deliver_one(&self, message: Message) -> std::result::Result<(), DeliveryError> {
        self.deliver(vec![message]).await
    }

    /// Builds a message, filling empty fields from the mailer's defaults.
    ///
    /// # Errors
    ///
    /// Returns [`mailwright_mime::Error::MissingBody`] (wrapped) without a
    /// plain or HTML body, or a charset error.
    fn create_message(&self, fields: MessageFields) -> Result<Message> {
        let defaults = self.message_defaults();
        let mut builder = Message::builder()
            .to_all(or_default(fields.to, &defaults.to))
            .cc_all(or_default(fields.cc, &defaults.cc))
            .bcc_all(or_default(fields.bcc, &defaults.bcc))
            .charset(fields.charset.unwrap_or_else(|| defaults.charset.clone()));

        if let Some(subject) = fields.subject.or_else(|| defaults.subject.clone()) {
            builder = builder.subject(subject);
        }
        if let Some(sender) = fields.sender.or_else(|| defaults.sender.clone()) {
            builder = builder.from(sender);
        }
        if let Some(body) = fields.plain_body {
            builder = builder.plain_body(body);
        }
        if let Some(body) = fields.html_body {
            builder = builder.html_body(body);
        }

        Ok(builder.build()?)
    }

    /// Creates a message and delivers it.
    ///
    /// # Errors
    ///
    /// Creation errors are returned as a [`DeliveryError`] without a message.
    async fn create_and_deliver(
        &self,
        fields: MessageFields,
    ) -> std::result::Result<(), DeliveryError> {
        let message = self.create_message(fields)?;
        self.deliver_one(message).await
    }

    /// Type name used in log lines.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
