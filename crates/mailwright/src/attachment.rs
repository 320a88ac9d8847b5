//! Attaching files from disk.

use std::io;
use std::path::Path;

use mailwright_mime::Message;
use tracing::debug;

use crate::error::Result;

/// Reads a file and attaches it to `message`.
///
/// `filename` defaults to the last path component; `mimetype` is guessed from
/// the file name when omitted.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or
/// [`mailwright_mime::Error::InvalidMimeType`] (wrapped) for a malformed
/// explicit MIME type.
pub async fn add_file_attachment(
    message: &mut Message,
    path: impl AsRef<Path>,
    filename: Option<&str>,
    mimetype: Option<&str>,
) -> Result<()> {
    let path = path.as_ref();
    let content = tokio::fs::read(path).await?;

    let filename = match filename {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no file name", path.display()),
                )
            })?,
    };

    debug!(path = %path.display(), filename = %filename, bytes = content.len(), "Attaching file");
    message.add_attachment(content, filename, mimetype)?;
    Ok(())
}
