//! Backend registry: maps backend names to constructors.

use serde_json::Value;

use crate::config::{MockConfig, SendmailConfig, SmtpConfig};
use crate::error::{Error, Result};
use crate::mailer::Mailer;
use crate::mock::MockMailer;
use crate::sendmail::SendmailMailer;
use crate::smtp::SmtpMailer;

/// Builds a mailer from its JSON arguments.
pub type BackendFactory = fn(Value) -> Result<Box<dyn Mailer>>;

const BACKENDS: &[(&str, BackendFactory)] = &[
    ("smtp", smtp_backend),
    ("sendmail", sendmail_backend),
    ("mock", mock_backend),
];

fn smtp_backend(args: Value) -> Result<Box<dyn Mailer>> {
    let config: SmtpConfig = serde_json::from_value(args)?;
    Ok(Box::new(SmtpMailer::new(config)?))
}

fn sendmail_backend(args: Value) -> Result<Box<dyn Mailer>> {
    let config: SendmailConfig = serde_json::from_value(args)?;
    Ok(Box::new(SendmailMailer::new(config)))
}

fn mock_backend(args: Value) -> Result<Box<dyn Mailer>> {
    let config: MockConfig = serde_json::from_value(args)?;
    Ok(Box::new(MockMailer::new(config)))
}

/// Names of all registered backends.
pub fn backend_names() -> impl Iterator<Item = &'static str> {
    BACKENDS.iter().map(|(name, _)| *name)
}

/// Looks up the constructor for `backend`.
#[must_use]
pub fn factory(backend: &str) -> Option<BackendFactory> {
    BACKENDS
        .iter()
        .find(|(name, _)| *name == backend)
        .map(|(_, factory)| *factory)
}

/// Creates a mailer of the named backend. `null` arguments mean "all defaults".
///
/// # Errors
///
/// Returns [`Error::UnknownBackend`] for unregistered names, or the
/// backend's configuration error.
pub fn create_mailer(backend: &str, args: Value) -> Result<Box<dyn Mailer>> {
    let factory = factory(backend).ok_or_else(|| Error::UnknownBackend(backend.to_string()))?;
    let args = if args.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        args
    };
    factory(args)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lists_builtin_backends() {
        assert_eq!(backend_names().collect::<Vec<_>>(), vec!["smtp", "sendmail", "mock"]);
    }

    #[test]
    fn creates_each_backend() {
        let smtp = create_mailer("smtp", json!({"host": "mail.example.com", "port": 2525})).unwrap();
        assert_eq!(smtp.to_string(), "SmtpMailer(host=\"mail.example.com\", port=2525)");

        let sendmail = create_mailer("sendmail", json!({"path": "/opt/bin/sendmail"})).unwrap();
        assert_eq!(sendmail.to_string(), "SendmailMailer(\"/opt/bin/sendmail\")");

        let mock = create_mailer("mock", Value::Null).unwrap();
        assert_eq!(mock.to_string(), "MockMailer()");
    }

    #[test]
    fn unknown_backend() {
        let err = create_mailer("carrier-pigeon", Value::Null).unwrap_err();
        assert!(matches!(err, Error::UnknownBackend(name) if name == "carrier-pigeon"));
    }

    #[test]
    fn bad_arguments() {
        let err = create_mailer("smtp", json!({"port": "not a number"})).unwrap_err();
        assert!(matches!(err, Error::Serde(_)));

        let err = create_mailer("smtp", json!({"max_concurrent_connections": 0})).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
