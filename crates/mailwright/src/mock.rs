//! In-memory backend for tests.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mailwright_mime::Message;

use crate::config::{MessageDefaults, MockConfig};
use crate::error::DeliveryError;
use crate::mailer::Mailer;

/// Stores delivered messages instead of sending them.
#[derive(Debug, Default)]
pub struct MockMailer {
    config: MockConfig,
    messages: Mutex<Vec<Message>>,
}

impl MockMailer {
    /// Creates a mailer from its configuration.
    #[must_use]
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            messages: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        // A panic while holding the lock cannot leave the Vec half-updated.
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies of the messages delivered so far.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.lock().clone()
    }

    /// Removes and returns the delivered messages.
    #[must_use]
    pub fn take_messages(&self) -> Vec<Message> {
        std::mem::take(&mut *self.lock())
    }
}

#[async_trait]
impl Mailer for MockMailer {
    fn message_defaults(&self) -> &MessageDefaults {
        &self.config.message_defaults
    }

    async fn deliver(&self, messages: Vec<Message>) -> Result<(), DeliveryError> {
        self.lock().extend(messages);
        Ok(())
    }
}

impl fmt::Display for MockMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MockMailer()")
    }
}
