//! Lifecycle wrapper that builds, starts and publishes a mailer.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::config::{MailerConfig, Resources};
use crate::error::{Error, Result};
use crate::mailer::Mailer;
use crate::registry;

/// A mailer under a resource name.
///
/// ```no_run
/// # async fn run() -> mailwright::Result<()> {
/// use mailwright::{MailerComponent, Resources};
/// use serde_json::json;
///
/// let mut component = MailerComponent::new("smtp", "default", json!({"host": "mail.example.com"}))?;
/// let mailer = component.start(&Resources::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MailerComponent {
    backend: String,
    resource_name: String,
    pending: Option<Box<dyn Mailer>>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl MailerComponent {
    /// Creates the backend through the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBackend`] or the backend's configuration error.
    pub fn new(backend: &str, resource_name: impl Into<String>, args: Value) -> Result<Self> {
        let mailer = registry::create_mailer(backend, args)?;
        Ok(Self::with_mailer(backend, resource_name, mailer))
    }

    /// Creates a component from a parsed configuration.
    ///
    /// # Errors
    ///
    /// See [`MailerComponent::new`].
    pub fn from_config(config: MailerConfig) -> Result<Self> {
        Self::new(&config.backend, config.resource_name, config.args)
    }

    /// Wraps an already constructed mailer.
    #[must_use]
    pub fn with_mailer(
        backend: impl Into<String>,
        resource_name: impl Into<String>,
        mailer: Box<dyn Mailer>,
    ) -> Self {
        Self {
            backend: backend.into(),
            resource_name: resource_name.into(),
            pending: Some(mailer),
            mailer: None,
        }
    }

    /// Starts the mailer and returns the shared handle.
    ///
    /// # Errors
    ///
    /// Returns the mailer's start error, or [`Error::Config`] if the
    /// component was already started.
    pub async fn start(&mut self, resources: &Resources) -> Result<Arc<dyn Mailer>> {
        let mut mailer = self.pending.take().ok_or_else(|| {
            Error::Config(format!("mailer {:?} was already started", self.resource_name))
        })?;
        mailer.start(resources).await?;

        let mailer: Arc<dyn Mailer> = Arc::from(mailer);
        info!(
            "Configured mailer ({}; class={})",
            self.resource_name,
            mailer.type_name()
        );
        self.mailer = Some(Arc::clone(&mailer));
        Ok(mailer)
    }

    /// The started mailer, if [`MailerComponent::start`] succeeded.
    #[must_use]
    pub fn mailer(&self) -> Option<Arc<dyn Mailer>> {
        self.mailer.clone()
    }

    /// Name the mailer is published under.
    #[must_use]
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// Registered backend name.
    #[must_use]
    pub fn backend(&self) -> &str {
        &self.backend
    }
}
