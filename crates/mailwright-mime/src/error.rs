//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Address is not `local@domain` or `Display Name <local@domain>`.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Explicit attachment MIME type is not `type/subtype`.
    #[error("mimetype must be a string in the \"maintype/subtype\" format (got {0:?})")]
    InvalidMimeType(String),

    /// Neither a plain text nor an HTML body was given.
    #[error("message needs a plain text or HTML body")]
    MissingBody,

    /// Charset label is not known.
    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    /// Body text contains characters the charset cannot represent.
    #[error("Text cannot be encoded as {0}")]
    Unencodable(String),

    /// Invalid header name or value.
    #[error("Invalid MIME header: {0}")]
    InvalidHeader(String),
}
