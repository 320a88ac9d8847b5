//! Binary attachments.

use crate::content_type::ContentType;
use crate::error::Result;

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    content: Vec<u8>,
    filename: String,
    content_type: ContentType,
    inline: bool,
    content_id: Option<String>,
}

impl Attachment {
    /// Creates an attachment.
    ///
    /// Without an explicit `mimetype` (or with an empty one) the type is
    /// guessed from `filename`, falling back to `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidMimeType`] if `mimetype` is given but
    /// not in `type/subtype` form.
    pub fn new(
        content: impl Into<Vec<u8>>,
        filename: impl Into<String>,
        mimetype: Option<&str>,
    ) -> Result<Self> {
        let filename = filename.into();
        let content_type = match mimetype.filter(|m| !m.is_empty()) {
            Some(mimetype) => ContentType::parse_essence(mimetype)?,
            None => ContentType::guess_from_filename(&filename),
        };

        Ok(Self {
            content: content.into(),
            filename,
            content_type,
            inline: false,
            content_id: None,
        })
    }

    /// Marks the attachment for inline display, referenced as `cid:<content_id>`.
    #[must_use]
    pub fn inline(mut self, content_id: impl Into<String>) -> Self {
        self.inline = true;
        self.content_id = Some(content_id.into());
        self
    }

    /// Raw (unencoded) content.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// File name shown to the recipient.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// MIME type of the content.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// True for `Content-Disposition: inline`.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        self.inline
    }

    /// Content-ID for inline references.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }
}
