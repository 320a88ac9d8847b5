//! Framed I/O for the SMTP protocol.
//!
//! SMTP replies are CRLF-terminated lines. Reading goes through a
//! `BufReader`, so however the server's bytes are split into TCP segments,
//! each call consumes exactly one line and no more.

#![allow(clippy::missing_errors_doc)]

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

use crate::command::Command;
use crate::parser::ReplyAssembler;
use crate::types::Reply;
use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum reply line length (RFC 5321 allows 512, servers exceed it).
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Line-oriented SMTP stream with per-operation timeouts.
#[derive(Debug)]
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
    timeout: Duration,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            timeout,
        }
    }

    /// Returns the timeout applied to each read and write.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reads one complete reply, following `NNN-` continuation lines.
    ///
    /// Error codes are returned as part of the reply, not as errors.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedResponse`] for a line that is not a reply line,
    /// [`Error::ConnectionClosed`] on EOF, [`Error::Timeout`] if a line does
    /// not arrive in time.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        let mut assembler = ReplyAssembler::new();
        loop {
            let line = self.read_line().await?;
            trace!(line = %line, "S:");
            if let Some(reply) = assembler.push(&line)? {
                return Ok(reply);
            }
        }
    }

    /// Reads a single line, without its line ending.
    async fn read_line(&mut self) -> Result<String> {
        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.read_line_inner())
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    async fn read_line_inner(&mut self) -> Result<String> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::ConnectionClosed);
            }

            if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                line.extend_from_slice(&buf[..pos]);
                self.reader.consume(pos + 1);
                break;
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::MalformedResponse(format!(
                    "reply line longer than {MAX_LINE_LENGTH} bytes"
                )));
            }
        }

        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Writes a single command.
    pub async fn write_command(&mut self, command: &Command) -> Result<()> {
        self.write_commands(std::slice::from_ref(command)).await
    }

    /// Writes several commands in one burst (pipelining).
    pub async fn write_commands(&mut self, commands: &[Command]) -> Result<()> {
        let mut buffer = std::mem::take(&mut self.write_buffer);
        buffer.clear();
        for command in commands {
            command.encode(&mut buffer);
        }

        let result = self.write_raw(&buffer).await;
        self.write_buffer = buffer;
        result
    }

    /// Writes raw bytes (message content after DATA) and flushes.
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let timeout = self.timeout;
        let stream = self.reader.get_mut();
        tokio::time::timeout(timeout, async {
            stream.write_all(data).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| Error::Timeout(timeout))??;

        Ok(())
    }

    /// Returns true if bytes beyond the last consumed line are buffered.
    pub fn has_buffered_data(&self) -> bool {
        !self.reader.buffer().is_empty()
    }

    /// Gets a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        self.reader.get_mut()
    }

    /// Shuts down the write side of the underlying stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.reader.get_mut().shutdown())
            .await
            .map_err(|_| Error::Timeout(timeout))??;
        Ok(())
    }
}
