//! Mailer configuration types.
//!
//! Every backend can be configured programmatically through a builder or
//! deserialized from JSON. Timeouts are given in seconds in JSON.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mailwright_mime::{Address, DEFAULT_CHARSET};
use rustls::ClientConfig;
use serde::{Deserialize, Deserializer};

/// Default timeout for network operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default ceiling for simultaneous SMTP connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 50;

/// Default path of the sendmail executable.
pub const DEFAULT_SENDMAIL_PATH: &str = "/usr/sbin/sendmail";

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    /// Plaintext session. **Not recommended outside local relays.**
    #[default]
    None,
    /// TLS from the first byte (port 465 style).
    Implicit,
    /// Plaintext connect, upgraded with STARTTLS after the first EHLO.
    StartTls,
}

/// Where the TLS client configuration comes from.
#[derive(Clone, Default)]
pub enum TlsContextRef {
    /// Mozilla root certificates from `webpki-roots`.
    #[default]
    Default,
    /// A configuration registered in [`Resources`] under this name, resolved
    /// when the mailer starts.
    Named(String),
    /// An explicit configuration.
    Config(Arc<ClientConfig>),
}

impl fmt::Debug for TlsContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Config(_) => f.write_str("Config(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for TlsContextRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.map_or(Self::Default, Self::Named))
    }
}

/// Defaults applied by `create_message` to fields the caller leaves empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessageDefaults {
    /// Subject line.
    pub subject: Option<String>,
    /// From address.
    pub sender: Option<Address>,
    /// Primary recipients.
    #[serde(deserialize_with = "one_or_many")]
    pub to: Vec<Address>,
    /// Secondary recipients.
    #[serde(deserialize_with = "one_or_many")]
    pub cc: Vec<Address>,
    /// Hidden recipients.
    #[serde(deserialize_with = "one_or_many")]
    pub bcc: Vec<Address>,
    /// Charset for text bodies.
    pub charset: String,
}

impl Default for MessageDefaults {
    fn default() -> Self {
        Self {
            subject: None,
            sender: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            charset: DEFAULT_CHARSET.to_string(),
        }
    }
}

/// Accepts either a single address or a list of them.
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Address>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Address),
        Many(Vec<Address>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(address) => vec![address],
        OneOrMany::Many(addresses) => addresses,
    })
}

fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

fn default_host() -> String {
    "localhost".to_string()
}

const fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

const fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

/// SMTP mailer configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    /// Server hostname.
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port; see [`SmtpConfig::effective_port`] for the default.
    #[serde(default)]
    pub port: Option<u16>,
    /// Connection security.
    #[serde(default)]
    pub tls: TlsMode,
    /// TLS client configuration used by [`TlsMode::Implicit`] and [`TlsMode::StartTls`].
    #[serde(default)]
    pub tls_context: TlsContextRef,
    /// Username to authenticate as.
    #[serde(default)]
    pub username: Option<String>,
    /// Password to authenticate with.
    #[serde(default)]
    pub password: Option<String>,
    /// Timeout for connecting and for every read or write.
    #[serde(default = "default_timeout", deserialize_with = "seconds")]
    pub timeout: Duration,
    /// Deliveries beyond this many open connections wait for a free slot.
    #[serde(default = "default_max_connections")]
    pub max_concurrent_connections: usize,
    /// Name sent with EHLO; defaults to this machine's host name.
    #[serde(default)]
    pub local_hostname: Option<String>,
    /// Defaults for `create_message`.
    #[serde(default)]
    pub message_defaults: MessageDefaults,
}

impl SmtpConfig {
    /// Creates a configuration for `host` with every other setting at its default.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            tls: TlsMode::None,
            tls_context: TlsContextRef::Default,
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
            max_concurrent_connections: DEFAULT_MAX_CONNECTIONS,
            local_hostname: None,
            message_defaults: MessageDefaults::default(),
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> SmtpConfigBuilder {
        SmtpConfigBuilder::new(host)
    }

    /// True when both username and password are set.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// The explicit port, else 587 with credentials and 25 without.
    #[must_use]
    pub const fn effective_port(&self) -> u16 {
        match self.port {
            Some(port) => port,
            None if self.has_credentials() => mailwright_smtp::SUBMISSION_PORT,
            None => mailwright_smtp::SMTP_PORT,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self::new(default_host())
    }
}

/// Builder for [`SmtpConfig`].
#[derive(Debug, Clone)]
pub struct SmtpConfigBuilder {
    config: SmtpConfig,
}

impl SmtpConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: SmtpConfig::new(host),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.config.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn tls(mut self, tls: TlsMode) -> Self {
        self.config.tls = tls;
        self
    }

    /// Uses an explicit TLS client configuration.
    #[must_use]
    pub fn tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.config.tls_context = TlsContextRef::Config(config);
        self
    }

    /// Uses the TLS configuration registered in [`Resources`] under `name`.
    #[must_use]
    pub fn tls_context_name(mut self, name: impl Into<String>) -> Self {
        self.config.tls_context = TlsContextRef::Named(name.into());
        self
    }

    /// Sets the login credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    /// Sets the network timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the connection ceiling.
    #[must_use]
    pub const fn max_concurrent_connections(mut self, max: usize) -> Self {
        self.config.max_concurrent_connections = max;
        self
    }

    /// Overrides the EHLO name.
    #[must_use]
    pub fn local_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.local_hostname = Some(hostname.into());
        self
    }

    /// Sets the message defaults.
    #[must_use]
    pub fn message_defaults(mut self, defaults: MessageDefaults) -> Self {
        self.config.message_defaults = defaults;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> SmtpConfig {
        self.config
    }
}

fn default_sendmail_path() -> PathBuf {
    PathBuf::from(DEFAULT_SENDMAIL_PATH)
}

/// Sendmail mailer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendmailConfig {
    /// Path to the sendmail executable.
    #[serde(default = "default_sendmail_path")]
    pub path: PathBuf,
    /// Defaults for `create_message`.
    #[serde(default)]
    pub message_defaults: MessageDefaults,
}

impl Default for SendmailConfig {
    fn default() -> Self {
        Self {
            path: default_sendmail_path(),
            message_defaults: MessageDefaults::default(),
        }
    }
}

/// Mock mailer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockConfig {
    /// Defaults for `create_message`.
    #[serde(default)]
    pub message_defaults: MessageDefaults,
}

fn default_resource_name() -> String {
    "default".to_string()
}

/// Top-level description of a mailer component.
///
/// ```json
/// { "backend": "smtp", "resource_name": "alerts", "args": { "host": "mail.example.com" } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailerConfig {
    /// Registered backend name (`smtp`, `sendmail`, `mock`).
    pub backend: String,
    /// Name the mailer is published under.
    #[serde(default = "default_resource_name")]
    pub resource_name: String,
    /// Backend-specific arguments.
    #[serde(default)]
    pub args: serde_json::Value,
}

impl MailerConfig {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has unknown fields.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Shared objects that mailers resolve by name when they start.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    tls_contexts: HashMap<String, Arc<ClientConfig>>,
}

impl Resources {
    /// Creates an empty set of resources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a TLS client configuration under `name`.
    pub fn add_tls_context(&mut self, name: impl Into<String>, config: Arc<ClientConfig>) {
        self.tls_contexts.insert(name.into(), config);
    }

    /// Looks up a TLS client configuration.
    #[must_use]
    pub fn tls_context(&self, name: &str) -> Option<Arc<ClientConfig>> {
        self.tls_contexts.get(name).cloned()
    }
}
