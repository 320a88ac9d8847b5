//! Outgoing message structure and RFC 5322 serialization.

use chrono::{DateTime, FixedOffset, Local};
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::address::Address;
use crate::attachment::Attachment;
use crate::content_type::ContentType;
use crate::encoding::{Charset, encode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::part::Part;

/// Charset used when none is given.
pub const DEFAULT_CHARSET: &str = "utf-8";

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextBody {
    text: String,
    encoded: Vec<u8>,
}

/// An email message ready for delivery.
///
/// Fields are kept structured; the MIME tree and the wire form are rendered
/// on demand. Bcc recipients are part of [`Message::recipients`] and
/// [`Message::headers`] but never of [`Message::to_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    subject: Option<String>,
    from: Option<Address>,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    charset: Charset,
    plain_body: Option<TextBody>,
    html_body: Option<TextBody>,
    attachments: Vec<Attachment>,
    extra_headers: Headers,
    date: DateTime<FixedOffset>,
    message_id: String,
    boundary_token: String,
    allow_8bit: bool,
}

impl Message {
    /// Starts building a message.
    #[must_use]
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Sender shown in the From header.
    #[must_use]
    pub const fn from(&self) -> Option<&Address> {
        self.from.as_ref()
    }

    /// Primary recipients.
    #[must_use]
    pub fn to(&self) -> &[Address] {
        &self.to
    }

    /// Secondary recipients.
    #[must_use]
    pub fn cc(&self) -> &[Address] {
        &self.cc
    }

    /// Hidden recipients.
    #[must_use]
    pub fn bcc(&self) -> &[Address] {
        &self.bcc
    }

    /// Charset name used for text bodies.
    #[must_use]
    pub fn charset(&self) -> &'static str {
        self.charset.name()
    }

    /// Plain text body.
    #[must_use]
    pub fn plain_body(&self) -> Option<&str> {
        self.plain_body.as_ref().map(|b| b.text.as_str())
    }

    /// HTML body.
    #[must_use]
    pub fn html_body(&self) -> Option<&str> {
        self.html_body.as_ref().map(|b| b.text.as_str())
    }

    /// Attachments in the order they were added.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Date header value.
    #[must_use]
    pub const fn date(&self) -> &DateTime<FixedOffset> {
        &self.date
    }

    /// Message-ID header value, angle brackets included.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Adds an attachment. See [`Attachment::new`] for MIME type rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMimeType`] for a malformed explicit MIME type.
    pub fn add_attachment(
        &mut self,
        content: impl Into<Vec<u8>>,
        filename: impl Into<String>,
        mimetype: Option<&str>,
    ) -> Result<()> {
        self.attachments
            .push(Attachment::new(content, filename, mimetype)?);
        Ok(())
    }

    /// Adds a prepared attachment.
    pub fn attach(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Mailboxes of all intended recipients: To, then Cc, then Bcc.
    #[must_use]
    pub fn recipients(&self) -> Vec<&Address> {
        self.to.iter().chain(&self.cc).chain(&self.bcc).collect()
    }

    /// Content type of the top-level entity.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.root_part()
            .content_type()
            .unwrap_or_else(|| ContentType::text("plain", self.charset.name()))
    }

    /// Top-level MIME parts. Empty for a single-part message.
    #[must_use]
    pub fn parts(&self) -> Vec<Part> {
        match self.root_part().body {
            crate::part::PartBody::Multipart { parts, .. } => parts,
            crate::part::PartBody::Leaf(_) => Vec::new(),
        }
    }

    /// All top-level headers, Bcc included.
    #[must_use]
    pub fn headers(&self) -> Headers {
        let mut headers = self.envelope_headers(true);
        for (name, value) in self.root_part().headers.iter() {
            headers.add(name, value);
        }
        headers
    }

    /// RFC 5322 serialization for transmission, without the Bcc header.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let root = self.root_part();
        let mut headers = self.envelope_headers(false);
        for (name, value) in root.headers.iter() {
            headers.add(name, value);
        }

        let mut out = headers.to_string().into_bytes();
        out.extend_from_slice(b"\r\n");
        root.write_body(&mut out);
        out
    }

    fn envelope_headers(&self, include_bcc: bool) -> Headers {
        let mut headers = Headers::new();
        if let Some(subject) = &self.subject {
            headers.add("Subject", encode_rfc2047(subject));
        }
        if let Some(from) = &self.from {
            headers.add("From", from.to_header_value());
        }

        let mut lists = vec![("To", &self.to), ("Cc", &self.cc)];
        if include_bcc {
            lists.push(("Bcc", &self.bcc));
        }
        for (name, list) in lists {
            if !list.is_empty() {
                let value = list
                    .iter()
                    .map(Address::to_header_value)
                    .collect::<Vec<_>>()
                    .join(", ");
                headers.add(name, value);
            }
        }

        headers.add("Date", self.date.to_rfc2822());
        headers.add("Message-ID", self.message_id.as_str());
        for (name, value) in self.extra_headers.iter() {
            headers.add(name, value);
        }
        headers.add("MIME-Version", "1.0");
        headers
    }

    fn root_part(&self) -> Part {
        let text_part = |body: &TextBody, sub_type: &str| {
            Part::text(&body.encoded, sub_type, self.charset, self.allow_8bit)
        };

        let body = match (&self.plain_body, &self.html_body) {
            (Some(plain), Some(html)) => Part::multipart(
                "alternative",
                self.boundary(1),
                vec![text_part(plain, "plain"), text_part(html, "html")],
            ),
            (Some(plain), None) => text_part(plain, "plain"),
            (None, Some(html)) => text_part(html, "html"),
            // The builder refuses this; render an empty text part regardless.
            (None, None) => Part::text(b"", "plain", self.charset, false),
        };

        if self.attachments.is_empty() {
            return body;
        }

        let mut parts = Vec::with_capacity(self.attachments.len() + 1);
        parts.push(body);
        parts.extend(self.attachments.iter().map(Part::attachment));
        Part::multipart("mixed", self.boundary(0), parts)
    }

    fn boundary(&self, level: u8) -> String {
        format!("==============={}{level}==", self.boundary_token)
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Builder for [`Message`].
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    subject: Option<String>,
    from: Option<Address>,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    charset: Option<String>,
    plain_body: Option<String>,
    html_body: Option<String>,
    attachments: Vec<Attachment>,
    headers: Headers,
    date: Option<DateTime<FixedOffset>>,
    message_id: Option<String>,
    allow_8bit: bool,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subject line.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the From address.
    #[must_use]
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Adds a To recipient.
    #[must_use]
    pub fn to(mut self, to: Address) -> Self {
        self.to.push(to);
        self
    }

    /// Adds several To recipients.
    #[must_use]
    pub fn to_all(mut self, to: impl IntoIterator<Item = Address>) -> Self {
        self.to.extend(to);
        self
    }

    /// Adds a Cc recipient.
    #[must_use]
    pub fn cc(mut self, cc: Address) -> Self {
        self.cc.push(cc);
        self
    }

    /// Adds several Cc recipients.
    #[must_use]
    pub fn cc_all(mut self, cc: impl IntoIterator<Item = Address>) -> Self {
        self.cc.extend(cc);
        self
    }

    /// Adds a Bcc recipient.
    #[must_use]
    pub fn bcc(mut self, bcc: Address) -> Self {
        self.bcc.push(bcc);
        self
    }

    /// Adds several Bcc recipients.
    #[must_use]
    pub fn bcc_all(mut self, bcc: impl IntoIterator<Item = Address>) -> Self {
        self.bcc.extend(bcc);
        self
    }

    /// Sets the charset label for text bodies (default `utf-8`).
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn plain_body(mut self, body: impl Into<String>) -> Self {
        self.plain_body = Some(body.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Adds a custom header, written after Message-ID.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Overrides the Date header (defaults to now).
    #[must_use]
    pub const fn date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Overrides the generated Message-ID (angle brackets are added if missing).
    #[must_use]
    pub fn message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Lets non-ASCII text go out as `8bit` instead of quoted-printable.
    #[must_use]
    pub const fn allow_8bit(mut self, allow: bool) -> Self {
        self.allow_8bit = allow;
        self
    }

    /// Builds the message.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingBody`] without a plain or HTML body
    /// - [`Error::UnknownCharset`] / [`Error::Unencodable`] for charset problems
    /// - [`Error::InvalidHeader`] for malformed custom headers or a line
    ///   break in the Subject or Message-ID
    pub fn build(self) -> Result<Message> {
        if self.plain_body.is_none() && self.html_body.is_none() {
            return Err(Error::MissingBody);
        }

        let charset = Charset::for_label(self.charset.as_deref().unwrap_or(DEFAULT_CHARSET))?;
        let encode = |text: Option<String>| -> Result<Option<TextBody>> {
            text.map(|text| {
                let encoded = charset.encode(&text)?;
                Ok(TextBody { text, encoded })
            })
            .transpose()
        };
        let plain_body = encode(self.plain_body)?;
        let html_body = encode(self.html_body)?;

        for (name, value) in self.headers.iter() {
            validate_header(name, value)?;
        }
        if let Some(subject) = &self.subject
            && subject.contains(['\r', '\n'])
        {
            return Err(Error::InvalidHeader(format!(
                "Subject contains a line break: {subject:?}"
            )));
        }
        if let Some(id) = &self.message_id {
            validate_header("Message-ID", id)?;
        }

        let date = self.date.unwrap_or_else(|| Local::now().fixed_offset());
        let message_id = match self.message_id {
            Some(id) if id.starts_with('<') => id,
            Some(id) => format!("<{id}>"),
            None => {
                let domain = self
                    .from
                    .as_ref()
                    .map_or("localhost", Address::domain);
                format!(
                    "<{}.{}@{domain}>",
                    date.format("%Y%m%d%H%M%S"),
                    random_token(16)
                )
            }
        };

        Ok(Message {
            subject: self.subject,
            from: self.from,
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            charset,
            plain_body,
            html_body,
            attachments: self.attachments,
            extra_headers: self.headers,
            date,
            message_id,
            boundary_token: random_token(24),
            allow_8bit: self.allow_8bit,
        })
    }
}

fn validate_header(name: &str, value: &str) -> Result<()> {
    let name_ok = !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':');
    if !name_ok {
        return Err(Error::InvalidHeader(format!("bad header name: {name:?}")));
    }
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidHeader(format!(
            "header {name} contains a line break"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn basic() -> MessageBuilder {
        MessageBuilder::new()
            .subject("Greetings")
            .from(addr("Sender <sender@example.com>"))
            .to(addr("to@example.com"))
            .cc(addr("cc@example.com"))
            .bcc(addr("hidden@example.com"))
    }

    fn rendered(message: &Message) -> String {
        String::from_utf8(message.to_bytes()).unwrap()
    }

    #[test]
    fn body_is_required() {
        assert_eq!(basic().build().unwrap_err(), Error::MissingBody);
    }

    #[test]
    fn plain_only_is_single_part() {
        let message = basic().plain_body("Hello").build().unwrap();
        assert_eq!(message.content_type().essence(), "text/plain");
        assert_eq!(message.content_type().charset(), Some("utf-8"));
        assert!(message.parts().is_empty());

        let text = rendered(&message);
        assert!(text.starts_with("Subject: Greetings\r\nFrom: Sender <sender@example.com>\r\n"));
        assert!(text.contains("\r\nMIME-Version: 1.0\r\n"));
        assert!(text.ends_with("\r\n\r\nHello\r\n"));
    }

    #[test]
    fn html_only() {
        let message = basic().html_body("<p>Hi</p>").build().unwrap();
        assert_eq!(message.content_type().essence(), "text/html");
    }

    #[test]
    fn plain_and_html_make_alternative_in_order() {
        let message = basic()
            .plain_body("plain text")
            .html_body("<p>html</p>")
            .build()
            .unwrap();

        assert_eq!(message.content_type().essence(), "multipart/alternative");
        let parts = message.parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].content_type().unwrap().essence(), "text/plain");
        assert_eq!(parts[1].content_type().unwrap().essence(), "text/html");
    }

    #[test]
    fn bcc_excluded_from_bytes_but_kept_elsewhere() {
        let message = basic().plain_body("x").build().unwrap();

        assert!(!rendered(&message).contains("hidden@example.com"));
        assert!(!rendered(&message).contains("Bcc:"));
        assert_eq!(message.headers().get("Bcc"), Some("hidden@example.com"));

        let recipients: Vec<&str> = message.recipients().iter().map(|a| a.email()).collect();
        assert_eq!(
            recipients,
            vec!["to@example.com", "cc@example.com", "hidden@example.com"]
        );
    }

    #[test]
    fn attachments_wrap_body_in_mixed() {
        let mut message = basic()
            .plain_body("see attached")
            .html_body("<p>see attached</p>")
            .build()
            .unwrap();
        message
            .add_attachment(b"\x00\x01binary".to_vec(), "data.bin", None)
            .unwrap();

        assert_eq!(message.content_type().essence(), "multipart/mixed");
        let parts = message.parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[0].content_type().unwrap().essence(),
            "multipart/alternative"
        );
        assert_eq!(parts[0].children().len(), 2);
        assert_eq!(
            parts[1].headers.get("Content-Disposition"),
            Some("attachment; filename=\"data.bin\"")
        );
        assert_eq!(
            parts[1].headers.get("Content-Transfer-Encoding"),
            Some("base64")
        );
    }

    #[test]
    fn invalid_attachment_mimetype() {
        let mut message = basic().plain_body("x").build().unwrap();
        let err = message
            .add_attachment(b"x".to_vec(), "a.txt", Some("bogus"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMimeType(_)));
        assert!(message.attachments().is_empty());
    }

    #[test]
    fn rendering_is_stable() {
        let message = basic()
            .plain_body("a")
            .html_body("<b>a</b>")
            .build()
            .unwrap();
        assert_eq!(message.to_bytes(), message.to_bytes());
    }

    #[test]
    fn non_utf8_charset() {
        let message = basic()
            .charset("iso-8859-1")
            .plain_body("café")
            .build()
            .unwrap();
        assert_eq!(message.charset(), "windows-1252");
        let bytes = message.to_bytes();
        // é is 0xE9 in Latin-1, quoted-printable encoded.
        assert!(String::from_utf8(bytes).unwrap().contains("caf=E9"));
    }

    #[test]
    fn unknown_charset_rejected() {
        let err = basic().charset("nope").plain_body("x").build().unwrap_err();
        assert!(matches!(err, Error::UnknownCharset(_)));
    }

    #[test]
    fn allow_8bit_keeps_raw_utf8() {
        let message = basic().plain_body("Grüße").allow_8bit(true).build().unwrap();
        let text = rendered(&message);
        assert!(text.contains("Content-Transfer-Encoding: 8bit"));
        assert!(text.ends_with("\r\n\r\nGrüße\r\n"));
    }

    #[test]
    fn non_ascii_subject_is_encoded() {
        let message = MessageBuilder::new()
            .subject("Grüße")
            .plain_body("x")
            .build()
            .unwrap();
        assert!(rendered(&message).starts_with("Subject: =?utf-8?B?R3LDvMOfZQ==?=\r\n"));
        assert_eq!(message.subject(), Some("Grüße"));
    }

    #[test]
    fn header_injection_rejected() {
        let err = basic()
            .plain_body("x")
            .header("X-Tag", "a\r\nBcc: evil@example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));

        let err = MessageBuilder::new()
            .subject("hi\r\nBcc: evil@example.com")
            .plain_body("x")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));

        let err = basic()
            .plain_body("x")
            .message_id("abc@host>\r\nBcc: evil@example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(ref text) if text.contains("Message-ID")));
    }

    #[test]
    fn message_id_uses_sender_domain() {
        let message = basic().plain_body("x").build().unwrap();
        assert!(message.message_id().starts_with('<'));
        assert!(message.message_id().ends_with("@example.com>"));

        let message = basic().plain_body("x").message_id("abc@host").build().unwrap();
        assert_eq!(message.message_id(), "<abc@host>");
    }
}
