//! SMTP delivery backend.
//!
//! Each [`Mailer::deliver`] call opens one connection, runs one transaction
//! per message and closes the connection again, whatever happened. A
//! semaphore bounds how many connections are open at once.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use mailwright_mime::Message;
use mailwright_smtp::{Credentials, SmtpClient, SmtpStream, connect, default_tls_config};
use rustls::ClientConfig;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::{MessageDefaults, Resources, SmtpConfig, TlsContextRef, TlsMode};
use crate::error::{DeliveryError, Error, Result};
use crate::mailer::Mailer;

/// Delivers mail through an SMTP server.
#[derive(Debug)]
pub struct SmtpMailer {
    config: SmtpConfig,
    port: u16,
    credentials: Option<Credentials>,
    tls_config: Option<Arc<ClientConfig>>,
    local_hostname: String,
    connections: Semaphore,
}

impl SmtpMailer {
    /// Creates a mailer. A named TLS context is resolved later, in
    /// [`Mailer::start`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `max_concurrent_connections` is zero, the
    /// credentials contain control characters, or `local_hostname` is not a
    /// single word.
    pub fn new(config: SmtpConfig) -> Result<Self> {
        if config.max_concurrent_connections == 0 {
            return Err(Error::Config(
                "max_concurrent_connections must be at least 1".to_string(),
            ));
        }
        for (field, value) in [("username", &config.username), ("password", &config.password)] {
            if value.as_deref().is_some_and(|v| v.chars().any(char::is_control)) {
                return Err(Error::Config(format!(
                    "{field} must not contain control characters"
                )));
            }
        }
        if let Some(name) = &config.local_hostname
            && mailwright_smtp::command::check_argument("local_hostname", name).is_err()
        {
            return Err(Error::Config(format!(
                "local_hostname must be a single word without control characters, got {name:?}"
            )));
        }

        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => None,
        };
        let tls_config = match &config.tls_context {
            TlsContextRef::Config(tls) => Some(Arc::clone(tls)),
            TlsContextRef::Default if config.tls != TlsMode::None => Some(default_tls_config()),
            TlsContextRef::Default | TlsContextRef::Named(_) => None,
        };
        let local_hostname = config
            .local_hostname
            .clone()
            .unwrap_or_else(system_hostname);

        Ok(Self {
            port: config.effective_port(),
            connections: Semaphore::new(config.max_concurrent_connections),
            credentials,
            tls_config,
            local_hostname,
            config,
        })
    }

    /// Server hostname.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Server port after defaulting.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// The configuration this mailer was built from.
    #[must_use]
    pub const fn config(&self) -> &SmtpConfig {
        &self.config
    }

    fn tls(&self) -> Result<Arc<ClientConfig>> {
        self.tls_config.clone().ok_or_else(|| match &self.config.tls_context {
            TlsContextRef::Named(name) => Error::Config(format!(
                "TLS context {name:?} has not been resolved; start the mailer first"
            )),
            _ => Error::Config("no TLS configuration available".to_string()),
        })
    }

    /// Opens the transport and brings the session to the point where mail
    /// transactions can start.
    async fn open(&self) -> Result<SmtpClient<SmtpStream>> {
        let implicit = match self.config.tls {
            TlsMode::Implicit => Some(self.tls()?),
            TlsMode::None | TlsMode::StartTls => None,
        };
        let stream = connect(&self.config.host, self.port, implicit, self.config.timeout).await?;
        info!(host = %self.config.host, port = self.port, tls = ?self.config.tls, "Connected to SMTP server");
        Ok(SmtpClient::new(stream, self.config.timeout))
    }

    async fn handshake(&self, client: &mut SmtpClient<SmtpStream>) -> Result<()> {
        client.read_greeting().await?;
        client.ehlo(&self.local_hostname).await?;

        if self.config.tls == TlsMode::StartTls {
            client.starttls(&self.config.host, self.tls()?).await?;
            client.ehlo(&self.local_hostname).await?;
        }

        if let Some(credentials) = &self.credentials {
            client.authenticate(credentials).await?;
            debug!(username = credentials.username(), "SMTP authentication succeeded");
        }
        Ok(())
    }

    async fn send_all(
        &self,
        client: &mut SmtpClient<SmtpStream>,
        messages: Vec<Message>,
    ) -> std::result::Result<(), DeliveryError> {
        self.handshake(client).await?;

        for message in messages {
            if let Err(err) = send_message(client, &message).await {
                return Err(DeliveryError::new(err, Some(message)));
            }
        }
        Ok(())
    }
}

async fn send_message(client: &mut SmtpClient<SmtpStream>, message: &Message) -> Result<()> {
    let sender = message.from().ok_or_else(|| {
        mailwright_smtp::Error::InvalidAddress("message has no From address".to_string())
    })?;
    let from = mailwright_smtp::Address::new(sender.email())?;
    let recipients = message
        .recipients()
        .into_iter()
        .map(|address| mailwright_smtp::Address::new(address.email()))
        .collect::<mailwright_smtp::Result<Vec<_>>>()?;

    let reply = client.send_mail(&from, &recipients, &message.to_bytes()).await?;
    debug!(
        message_id = message.message_id(),
        recipients = recipients.len(),
        code = %reply.code,
        "Message accepted"
    );
    Ok(())
}

fn system_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| mailwright_smtp::command::check_argument("hostname", name).is_ok())
        .unwrap_or_else(|| "localhost".to_string())
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn start(&mut self, resources: &Resources) -> Result<()> {
        if let TlsContextRef::Named(name) = &self.config.tls_context {
            let tls = resources
                .tls_context(name)
                .ok_or_else(|| Error::Config(format!("no TLS context named {name:?}")))?;
            self.tls_config = Some(tls);
        }
        Ok(())
    }

    fn message_defaults(&self) -> &MessageDefaults {
        &self.config.message_defaults
    }

    async fn deliver(&self, messages: Vec<Message>) -> std::result::Result<(), DeliveryError> {
        if messages.is_empty() {
            return Ok(());
        }

        let _permit = self
            .connections
            .acquire()
            .await
            .map_err(|_| Error::Config("connection pool closed".to_string()))?;

        let mut client = self.open().await?;
        let result = self.send_all(&mut client, messages).await;

        if let Err(err) = client.quit().await {
            warn!(host = %self.config.host, error = %err, "Failed to close SMTP session cleanly");
        }
        result
    }
}

impl fmt::Display for SmtpMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SmtpMailer(host={:?}, port={})", self.config.host, self.port)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_host_and_port() {
        let mailer = SmtpMailer::new(SmtpConfig::new("mail.example.com")).unwrap();
        assert_eq!(mailer.to_string(), "SmtpMailer(host=\"mail.example.com\", port=25)");

        let config = SmtpConfig::builder("mail.example.com")
            .credentials("user", "pw")
            .build();
        assert_eq!(SmtpMailer::new(config).unwrap().port(), 587);
    }

    #[test]
    fn zero_connections_rejected() {
        let config = SmtpConfig::builder("mail.example.com")
            .max_concurrent_connections(0)
            .build();
        assert!(matches!(SmtpMailer::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn line_breaks_in_command_fields_rejected() {
        let config = SmtpConfig::builder("mail.example.com")
            .credentials("u", "p\r\nRSET")
            .build();
        assert!(matches!(SmtpMailer::new(config), Err(Error::Config(msg)) if msg.contains("password")));

        let config = SmtpConfig::builder("mail.example.com")
            .credentials("u\n", "p")
            .build();
        assert!(matches!(SmtpMailer::new(config), Err(Error::Config(msg)) if msg.contains("username")));

        for name in ["client.test\r\nRSET", "two words", ""] {
            let config = SmtpConfig::builder("mail.example.com")
                .local_hostname(name)
                .build();
            assert!(matches!(SmtpMailer::new(config), Err(Error::Config(_))), "accepted {name:?}");
        }
    }

    #[test]
    fn local_hostname_override() {
        let config = SmtpConfig::builder("mail.example.com")
            .local_hostname("client.example.org")
            .build();
        assert_eq!(SmtpMailer::new(config).unwrap().local_hostname, "client.example.org");
    }

    #[tokio::test]
    async fn named_tls_context_resolved_on_start() {
        let config = SmtpConfig::builder("mail.example.com")
            .tls(TlsMode::Implicit)
            .tls_context_name("corporate")
            .build();
        let mut mailer = SmtpMailer::new(config).unwrap();
        assert!(matches!(mailer.tls(), Err(Error::Config(_))));

        let missing = mailer.start(&Resources::new()).await;
        assert!(matches!(missing, Err(Error::Config(msg)) if msg.contains("corporate")));

        let mut resources = Resources::new();
        resources.add_tls_context("corporate", default_tls_config());
        mailer.start(&resources).await.unwrap();
        assert!(mailer.tls().is_ok());
    }

    #[tokio::test]
    async fn empty_batch_opens_no_connection() {
        // Port 9 on an unroutable test address: any connection attempt would fail.
        let config = SmtpConfig::builder("192.0.2.1").port(9).build();
        let mailer = SmtpMailer::new(config).unwrap();
        mailer.deliver(Vec::new()).await.unwrap();
    }
}
