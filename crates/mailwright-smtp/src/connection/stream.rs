//! Stream types for SMTP connections.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use rustls::ClientConfig;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use crate::{Error, Result};

/// A stream that can be either plaintext or TLS.
#[derive(Debug, Default)]
pub enum SmtpStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
    /// Placeholder while the stream is being upgraded, or after a failed upgrade.
    #[default]
    Closed,
}

impl SmtpStream {
    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Performs the TLS handshake on a plaintext stream (STARTTLS).
    ///
    /// On failure the stream is left `Closed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is not plaintext, the host name is not
    /// a valid server name, or the handshake fails or times out.
    pub async fn upgrade_to_tls(
        &mut self,
        host: &str,
        config: Arc<ClientConfig>,
        timeout: Duration,
    ) -> Result<()> {
        let tcp = match std::mem::take(self) {
            Self::Plain(tcp) => tcp,
            other => {
                *self = other;
                return Err(Error::InvalidState(
                    "STARTTLS requires a plaintext stream".to_string(),
                ));
            }
        };

        let tls = tls_handshake(tcp, host, config, timeout).await?;
        *self = Self::Tls(Box::new(tls));
        Ok(())
    }
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Closed => Poll::Ready(Ok(())),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Closed => Poll::Ready(Err(io::ErrorKind::NotConnected.into())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
            Self::Closed => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Closed => Poll::Ready(Ok(())),
        }
    }
}

/// Opens a connection to `host:port`, with an implicit TLS handshake when
/// `tls` is given. The whole attempt is bounded by `timeout`.
///
/// # Errors
///
/// DNS failure, refusal, timeout and handshake failure are all reported as
/// [`Error::Connect`].
pub async fn connect(
    host: &str,
    port: u16,
    tls: Option<Arc<ClientConfig>>,
    timeout: Duration,
) -> Result<SmtpStream> {
    let connect_error = |source: io::Error| Error::Connect {
        host: host.to_string(),
        port,
        source,
    };

    debug!(host, port, implicit_tls = tls.is_some(), "Opening SMTP connection");
    let tcp = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| connect_error(io::ErrorKind::TimedOut.into()))?
        .map_err(connect_error)?;

    match tls {
        None => Ok(SmtpStream::Plain(tcp)),
        Some(config) => {
            let stream = tls_handshake(tcp, host, config, timeout)
                .await
                .map_err(|e| match e {
                    Error::Io(source) => connect_error(source),
                    Error::Timeout(_) => connect_error(io::ErrorKind::TimedOut.into()),
                    other => other,
                })?;
            Ok(SmtpStream::Tls(Box::new(stream)))
        }
    }
}

async fn tls_handshake(
    tcp: TcpStream,
    host: &str,
    config: Arc<ClientConfig>,
    timeout: Duration,
) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(host.to_string())?;
    let connector = TlsConnector::from(config);
    let stream = tokio::time::timeout(timeout, connector.connect(server_name, tcp))
        .await
        .map_err(|_| Error::Timeout(timeout))??;
    Ok(stream)
}

/// Client configuration trusting the Mozilla root set from `webpki-roots`.
#[must_use]
pub fn default_tls_config() -> Arc<ClientConfig> {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connect_refused_names_host_and_port() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connect("127.0.0.1", port, None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connect { .. }));
        assert!(
            err.to_string()
                .starts_with(&format!("Error connecting to 127.0.0.1 on port {port}"))
        );
    }

    #[tokio::test]
    async fn plain_connect_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"220 hi\r\n").await.unwrap();
        });

        let mut stream = connect("127.0.0.1", port, None, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!stream.is_tls());
        let mut buf = String::new();
        stream.read_to_string(&mut buf).await.unwrap();
        assert_eq!(buf, "220 hi\r\n");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn closed_stream_reads_eof_and_rejects_writes() {
        let mut stream = SmtpStream::Closed;
        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
        assert!(stream.write_all(b"x").await.is_err());
    }

    #[tokio::test]
    async fn upgrade_requires_plain_stream() {
        let mut stream = SmtpStream::Closed;
        let err = stream
            .upgrade_to_tls("localhost", default_tls_config(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert!(matches!(stream, SmtpStream::Closed));
    }
}
