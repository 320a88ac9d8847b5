//! # mailwright
//!
//! Mail dispatch for async Rust.
//!
//! This crate provides:
//! - A [`Mailer`] trait with message creation from per-mailer defaults
//! - [`SmtpMailer`]: SMTP delivery with STARTTLS or implicit TLS, AUTH
//!   PLAIN/LOGIN, pipelining and a connection ceiling
//! - [`SendmailMailer`]: delivery through a local `sendmail` executable
//! - [`MockMailer`]: in-memory delivery for tests
//! - A backend registry and [`MailerComponent`] for configuration-driven setup
//!
//! ## Example
//!
//! ```no_run
//! use mailwright::{Mailer, MessageFields, SmtpConfig, SmtpMailer, TlsMode};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SmtpConfig::builder("smtp.example.com")
//!     .tls(TlsMode::StartTls)
//!     .credentials("user", "secret")
//!     .build();
//! let mailer = SmtpMailer::new(config)?;
//!
//! let mut message = mailer.create_message(
//!     MessageFields::new()
//!         .sender("Reports <reports@example.com>".parse()?)
//!         .to("team@example.com".parse()?)
//!         .subject("Weekly numbers")
//!         .plain_body("Attached."),
//! )?;
//! mailwright::add_file_attachment(&mut message, "weekly.csv", None, None).await?;
//!
//! mailer.deliver_one(message).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attachment;
pub mod component;
pub mod config;
mod error;
pub mod mailer;
pub mod mock;
pub mod registry;
pub mod sendmail;
pub mod smtp;

pub use attachment::add_file_attachment;
pub use component::MailerComponent;
pub use config::{
    MailerConfig, MessageDefaults, MockConfig, Resources, SendmailConfig, SmtpConfig,
    SmtpConfigBuilder, TlsContextRef, TlsMode,
};
pub use error::{DeliveryError, Error, Result};
pub use mailer::{Mailer, MessageFields};
pub use mailwright_mime::{Address, Attachment, Message, MessageBuilder};
pub use mock::MockMailer;
pub use sendmail::SendmailMailer;
pub use smtp::SmtpMailer;
