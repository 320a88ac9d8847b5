//! # mailwright-smtp
//!
//! Async SMTP client (RFC 5321) used by the `mailwright` delivery backends.
//!
//! ## Features
//!
//! - **Runtime session state**: every connection tracks where it stands, so
//!   cleanup (QUIT and close) is possible from any state, including after errors
//! - **Pipelining** (RFC 2920): MAIL, RCPT and DATA in one write, with every
//!   reply consumed before the first failure is reported
//! - **TLS**: implicit TLS and STARTTLS through rustls
//! - **Authentication**: PLAIN and LOGIN
//! - **Extensions**: 8BITMIME, SIZE, PIPELINING, STARTTLS, AUTH
//! - **Timeouts** on every read and write
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use mailwright_smtp::{Address, Credentials, SmtpClient, connect, default_tls_config};
//!
//! #[tokio::main]
//! async fn main() -> mailwright_smtp::Result<()> {
//!     let timeout = Duration::from_secs(30);
//!     let stream = connect("smtp.example.com", 587, None, timeout).await?;
//!     let mut client = SmtpClient::new(stream, timeout);
//!
//!     client.read_greeting().await?;
//!     client.ehlo("client.example.com").await?;
//!     client.starttls("smtp.example.com", default_tls_config()).await?;
//!     client.ehlo("client.example.com").await?;
//!     client.authenticate(&Credentials::new("user", "secret")).await?;
//!
//!     let from = Address::new("sender@example.com")?;
//!     let to = [Address::new("recipient@example.com")?];
//!     client
//!         .send_mail(&from, &to, b"Subject: Test\r\n\r\nHello, World!\r\n")
//!         .await?;
//!
//!     client.quit().await
//! }
//! ```
//!
//! ## Session states
//!
//! ```text
//! Unconnected ── greeting ──→ Greeted ── EHLO ──→ FeaturesKnown ── AUTH ──→ Authenticated
//!                                ↑                    │                           │
//!                                └──── STARTTLS ──────┘                           │
//!                          FeaturesKnown / Authenticated ── MAIL FROM ──→ InTransaction ── 354 ──→ Data
//! any ── quit() ──→ Closed
//! ```
//!
//! ## Modules
//!
//! - [`auth`]: SASL mechanism selection and credentials
//! - [`command`]: SMTP command builders
//! - [`connection`]: Transport, framing and the session client
//! - [`data`]: Dot-stuffing of message content
//! - [`parser`]: Reply line parser
//! - [`types`]: Core SMTP types (addresses, extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
pub mod connection;
pub mod data;
mod error;
pub mod parser;
pub mod types;

pub use auth::Credentials;
pub use connection::{
    ServerInfo, SessionState, SmtpClient, SmtpStream, connect, default_tls_config,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};

/// Port for SMTP relay without submission credentials.
pub const SMTP_PORT: u16 = 25;

/// Message submission port (RFC 6409).
pub const SUBMISSION_PORT: u16 = 587;

/// Submission over implicit TLS (RFC 8314).
pub const SUBMISSIONS_PORT: u16 = 465;
