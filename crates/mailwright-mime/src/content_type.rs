//! MIME content type handling.

use std::fmt;

use crate::error::{Error, Result};

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters in output order (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates a `text/<subtype>` content type with a charset.
    #[must_use]
    pub fn text(sub_type: impl Into<String>, charset: impl Into<String>) -> Self {
        Self::new("text", sub_type).with_parameter("charset", charset)
    }

    /// Creates a `multipart/<subtype>` content type with boundary.
    #[must_use]
    pub fn multipart(sub_type: impl Into<String>, boundary: impl Into<String>) -> Self {
        Self::new("multipart", sub_type).with_parameter("boundary", boundary)
    }

    /// Parses an attachment MIME type given as `type/subtype`.
    ///
    /// Both halves must be non-empty tokens; parameters are not accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMimeType`] for anything else.
    pub fn parse_essence(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidMimeType(s.to_string());
        let (main, sub) = s.trim().split_once('/').ok_or_else(invalid)?;

        let is_token = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(c))
        };
        if !is_token(main) || !is_token(sub) {
            return Err(invalid());
        }

        Ok(Self::new(main.to_ascii_lowercase(), sub.to_ascii_lowercase()))
    }

    /// Guesses the content type from a file name, defaulting to
    /// `application/octet-stream`.
    #[must_use]
    pub fn guess_from_filename(filename: &str) -> Self {
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        Self::new(mime.type_().as_str(), mime.subtype().as_str())
    }

    /// Adds a parameter, replacing an existing one of the same name.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self
            .parameters
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            slot.1 = value;
        } else {
            self.parameters.push((key, value));
        }
        self
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Parses a full content type header value.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if `type/subtype` is malformed.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');
        let mut content_type = Self::parse_essence(parts.next().unwrap_or_default())?;

        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                let value = value.trim().trim_matches('"').to_string();
                content_type = content_type.with_parameter(key.trim().to_ascii_lowercase(), value);
            }
        }

        Ok(content_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;

        for (key, value) in &self.parameters {
            // Quote value if it contains special characters
            if value.is_empty()
                || value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c))
            {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}
