//! # mailwright-mime
//!
//! MIME message generation for outgoing email.
//!
//! ## Features
//!
//! - **Addresses**: `Display Name <local@domain>` parsing, lists and validation
//! - **Message building**: plain, HTML or both (`multipart/alternative`)
//! - **Attachments**: base64 parts inside `multipart/mixed`, MIME type guessing
//! - **Charsets**: any label `encoding_rs` knows, RFC 2047 header encoding
//! - **Serialization**: RFC 5322 bytes with CRLF line endings, Bcc stripped
//!
//! ## Quick Start
//!
//! ```
//! use mailwright_mime::{Address, Message};
//!
//! # fn main() -> mailwright_mime::Result<()> {
//! let mut message = Message::builder()
//!     .from(Address::parse("Sender <sender@example.com>")?)
//!     .to(Address::parse("recipient@example.com")?)
//!     .subject("Monthly report")
//!     .plain_body("See attached.")
//!     .html_body("<p>See attached.</p>")
//!     .build()?;
//!
//! message.add_attachment(b"col1,col2\n".to_vec(), "report.csv", None)?;
//!
//! assert_eq!(message.content_type().essence(), "multipart/mixed");
//! let wire = message.to_bytes();
//! assert!(wire.starts_with(b"Subject: Monthly report\r\n"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Encoding helpers
//!
//! ```
//! use mailwright_mime::encoding::{encode_base64, encode_rfc2047};
//!
//! assert_eq!(encode_base64(b"Hello"), "SGVsbG8=\r\n");
//! assert_eq!(encode_rfc2047("Héllo"), "=?utf-8?B?SMOpbGxv?=");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod attachment;
mod content_type;
mod error;
mod header;
mod message;
mod part;

pub mod encoding;

pub use address::Address;
pub use attachment::Attachment;
pub use content_type::ContentType;
pub use encoding::Charset;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{DEFAULT_CHARSET, Message, MessageBuilder};
pub use part::{Part, PartBody, TransferEncoding};
