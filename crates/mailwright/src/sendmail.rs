//! Delivery through a local `sendmail` executable.

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use mailwright_mime::Message;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::{MessageDefaults, SendmailConfig};
use crate::error::{DeliveryError, Error, Result};
use crate::mailer::Mailer;

/// Pipes each message into `sendmail -i -B 8BITMIME <recipients...>`.
#[derive(Debug, Clone)]
pub struct SendmailMailer {
    config: SendmailConfig,
}

impl SendmailMailer {
    /// Creates a mailer from its configuration.
    #[must_use]
    pub const fn new(config: SendmailConfig) -> Self {
        Self { config }
    }

    /// Path to the executable.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let recipients: Vec<&str> = message.recipients().into_iter().map(|a| a.email()).collect();
        debug!(path = %self.config.path.display(), ?recipients, "Running sendmail");

        let mut child = Command::new(&self.config.path)
            .args(["-i", "-B", "8BITMIME"])
            .args(&recipients)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Sendmail("sendmail stdin is not available".to_string()))?;
        let bytes = message.to_bytes();
        let write = async move {
            let written = stdin.write_all(&bytes).await;
            // Closing stdin signals end of message.
            drop(stdin);
            written
        };

        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
            warn!(status = %output.status, stderr = %stderr, "sendmail failed");
            return Err(Error::Sendmail(stderr));
        }
        written?;
        Ok(())
    }
}

impl Default for SendmailMailer {
    fn default() -> Self {
        Self::new(SendmailConfig::default())
    }
}

#[async_trait]
impl Mailer for SendmailMailer {
    fn message_defaults(&self) -> &MessageDefaults {
        &self.config.message_defaults
    }

    async fn deliver(&self, messages: Vec<Message>) -> std::result::Result<(), DeliveryError> {
        for message in messages {
            if let Err(err) = self.send(&message).await {
                return Err(DeliveryError::new(err, Some(message)));
            }
        }
        Ok(())
    }
}

impl fmt::Display for SendmailMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SendmailMailer({:?})", self.config.path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn display_shows_path() {
        assert_eq!(
            SendmailMailer::default().to_string(),
            "SendmailMailer(\"/usr/sbin/sendmail\")"
        );
    }

    #[tokio::test]
    async fn missing_executable_reports_spawn_error() {
        let mailer = SendmailMailer::new(SendmailConfig {
            path: PathBuf::from("/nonexistent/sendmail"),
            ..SendmailConfig::default()
        });
        let message = mailer
            .create_message(
                crate::MessageFields::new()
                    .to("a@example.com".parse().unwrap())
                    .plain_body("hi"),
            )
            .unwrap();

        let err = mailer.deliver_one(message).await.unwrap_err();
        assert!(matches!(err.error(), Error::Io(_)));
        assert!(err.message().is_some());
    }
}
