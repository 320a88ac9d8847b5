//! SMTP client and session state machine.

use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::{FramedStream, ServerInfo, SessionState, SmtpStream};
use crate::auth::{self, Credentials};
use crate::command::{Command, check_argument};
use crate::data::{encode_data, is_8bit};
use crate::error::{Error, Result};
use crate::types::{Address, Reply, ReplyCode};

/// SMTP client driving one session over a stream.
///
/// The state is tracked at runtime so that cleanup (`quit`) stays possible
/// from every state, including after errors. Fatal errors (I/O, timeouts,
/// malformed replies) mark the session broken; no further QUIT is attempted
/// on a broken session.
#[derive(Debug)]
pub struct SmtpClient<S> {
    framed: FramedStream<S>,
    state: SessionState,
    server_info: ServerInfo,
    authenticated: bool,
    broken: bool,
}

impl<S> SmtpClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an open stream. Every read and write is bounded by `timeout`.
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self {
            framed: FramedStream::new(stream, timeout),
            state: SessionState::Unconnected,
            server_info: ServerInfo::default(),
            authenticated: false,
            broken: false,
        }
    }

    /// Returns the current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns what the server advertised in its last EHLO reply.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns true once a fatal error made the session unusable.
    #[must_use]
    pub const fn is_broken(&self) -> bool {
        self.broken
    }

    /// Reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting cannot be read or carries an error code.
    pub async fn read_greeting(&mut self) -> Result<Reply> {
        if self.state != SessionState::Unconnected {
            return Err(self.wrong_state("read the greeting"));
        }

        let reply = self.framed.read_reply().await;
        let reply = self.track(reply)?;
        debug!(code = %reply.code, "SMTP greeting");

        // The server has spoken; QUIT is appropriate from here on even if it refused us.
        self.state = SessionState::Greeted;
        self.server_info.hostname = reply
            .lines
            .first()
            .and_then(|line| line.split_whitespace().next())
            .unwrap_or_default()
            .to_string();
        self.check_reply(reply)
    }

    /// Writes a command without waiting for its reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or times out.
    pub async fn write_command(&mut self, command: &Command) -> Result<()> {
        debug!(command = %command, "SMTP command");
        let written = self.framed.write_command(command).await;
        self.track(written)
    }

    /// Reads one full reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reply`] for codes of 400 and above, and transport or
    /// framing errors as they occur.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        let reply = self.framed.read_reply().await;
        let reply = self.track(reply)?;
        debug!(code = %reply.code, "SMTP reply");
        self.check_reply(reply)
    }

    /// Sends a command and reads its reply.
    ///
    /// # Errors
    ///
    /// See [`Self::write_command`] and [`Self::read_reply`].
    pub async fn send_command(&mut self, command: &Command) -> Result<Reply> {
        self.write_command(command).await?;
        self.read_reply().await
    }

    /// Writes raw bytes, used for message content after DATA.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or times out.
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let written = self.framed.write_raw(data).await;
        self.track(written)
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not greeted, `hostname` is not a
    /// single command argument, or the server rejects EHLO.
    pub async fn ehlo(&mut self, hostname: &str) -> Result<&ServerInfo> {
        if !self.state.can_ehlo() {
            return Err(self.wrong_state("send EHLO"));
        }
        check_argument("EHLO hostname", hostname)?;

        let reply = self
            .send_command(&Command::Ehlo {
                hostname: hostname.to_string(),
            })
            .await?;

        self.server_info = ServerInfo::from_ehlo(&reply);
        self.state = SessionState::FeaturesKnown;
        debug!(extensions = ?self.server_info.extensions, "SMTP server features");
        Ok(&self.server_info)
    }

    /// Authenticates with the mechanisms advertised in the last EHLO reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthUnsupported`] if no usable mechanism is offered,
    /// or the server's rejection.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<Reply> {
        let mechanisms = self.server_info.auth_mechanisms().to_vec();
        auth::authenticate(self, &mechanisms, credentials).await
    }

    pub(crate) async fn send_auth(&mut self, command: &Command) -> Result<Reply> {
        if self.state != SessionState::FeaturesKnown {
            return Err(self.wrong_state("authenticate"));
        }

        let reply = self.send_command(command).await?;
        self.authenticated = true;
        self.state = SessionState::Authenticated;
        Ok(reply)
    }

    /// Runs one mail transaction: MAIL FROM, one RCPT TO per recipient, DATA,
    /// then the dot-stuffed message. MAIL FROM declares `SIZE=` (RFC 1870)
    /// when the server advertises SIZE.
    ///
    /// When the server advertises PIPELINING, MAIL, RCPT and DATA go out in a
    /// single write and all of their replies are read before the first
    /// failure is reported.
    ///
    /// # Errors
    ///
    /// Returns the first error reply, [`Error::MessageTooLarge`] if the
    /// server's SIZE limit is exceeded (checked before anything is sent), or
    /// transport errors.
    pub async fn send_mail(
        &mut self,
        from: &Address,
        recipients: &[Address],
        message: &[u8],
    ) -> Result<Reply> {
        if !self.state.can_start_transaction() {
            return Err(self.wrong_state("start a mail transaction"));
        }
        if recipients.is_empty() {
            return Err(Error::InvalidState(
                "mail transaction needs at least one recipient".to_string(),
            ));
        }
        if let Some(limit) = self.server_info.max_message_size()
            && message.len() > limit
        {
            return Err(Error::MessageTooLarge {
                size: message.len(),
                limit,
            });
        }

        let body =
            (self.server_info.supports_8bitmime() && is_8bit(message)).then(|| "8BITMIME".to_string());
        let size = self.server_info.supports_size().then_some(message.len());

        let mut commands = Vec::with_capacity(recipients.len() + 2);
        commands.push(Command::MailFrom {
            from: from.clone(),
            body,
            size,
        });
        commands.extend(recipients.iter().map(|to| Command::RcptTo { to: to.clone() }));
        commands.push(Command::Data);

        if self.server_info.supports_pipelining() {
            self.open_transaction_pipelined(&commands).await?;
        } else {
            self.open_transaction(&commands).await?;
        }

        let written = self.framed.write_raw(&encode_data(message)).await;
        self.track(written)?;

        let reply = self.framed.read_reply().await;
        let reply = self.track(reply)?;
        debug!(code = %reply.code, "SMTP end of data reply");
        self.state = self.idle_state();
        self.check_reply(reply)
    }

    async fn open_transaction(&mut self, commands: &[Command]) -> Result<()> {
        for command in commands {
            let reply = self.send_command(command).await?;
            self.advance(command, reply)?;
        }
        Ok(())
    }

    async fn open_transaction_pipelined(&mut self, commands: &[Command]) -> Result<()> {
        for command in commands {
            debug!(command = %command, "SMTP command (pipelined)");
        }
        let written = self.framed.write_commands(commands).await;
        self.track(written)?;
        self.state = SessionState::InTransaction;

        // Every reply of the batch is consumed, so the stream stays aligned
        // even when an early command fails.
        let mut first_error = None;
        for command in commands {
            let reply = self.framed.read_reply().await;
            let reply = self.track(reply)?;
            debug!(code = %reply.code, verb = command.verb(), "SMTP reply (pipelined)");

            let outcome = self.check_reply(reply).and_then(|reply| self.advance(command, reply));
            if let Err(err) = outcome {
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Applies the state change for a successful transaction command.
    fn advance(&mut self, command: &Command, reply: Reply) -> Result<()> {
        match command {
            Command::MailFrom { .. } => self.state = SessionState::InTransaction,
            Command::Data => {
                if reply.code != ReplyCode::START_DATA {
                    return Err(Error::reply(reply.code.as_u16(), reply.text()));
                }
                self.state = SessionState::Data;
            }
            _ => {}
        }
        Ok(())
    }

    /// Aborts the current transaction with RSET.
    ///
    /// # Errors
    ///
    /// Returns an error if RSET is rejected or the transport fails.
    pub async fn reset(&mut self) -> Result<()> {
        if matches!(
            self.state,
            SessionState::Unconnected | SessionState::Data | SessionState::Closed
        ) {
            return Err(self.wrong_state("send RSET"));
        }

        self.send_command(&Command::Rset).await?;
        if self.state == SessionState::InTransaction {
            self.state = self.idle_state();
        }
        Ok(())
    }

    /// Ends the session: QUIT when the server can still take it, then shuts
    /// the transport down. The session is `Closed` afterwards whatever the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns the first failure of QUIT or shutdown. Callers doing cleanup
    /// usually just log it.
    pub async fn quit(&mut self) -> Result<()> {
        let mut result = Ok(());
        if !self.broken && self.state.accepts_quit() {
            result = self.send_command(&Command::Quit).await.map(drop);
        } else if self.state != SessionState::Closed {
            debug!(state = %self.state, broken = self.broken, "Skipping QUIT");
        }

        let shutdown = if self.state == SessionState::Closed {
            Ok(())
        } else {
            self.framed.shutdown().await
        };
        self.state = SessionState::Closed;
        result.and(shutdown)
    }

    const fn idle_state(&self) -> SessionState {
        if self.authenticated {
            SessionState::Authenticated
        } else {
            SessionState::FeaturesKnown
        }
    }

    fn check_reply(&mut self, reply: Reply) -> Result<Reply> {
        // 421 means the server is closing the channel.
        if reply.code == ReplyCode::SERVICE_UNAVAILABLE {
            self.broken = true;
        }
        reply.into_result()
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result
            && err.is_fatal()
        {
            self.broken = true;
        }
        result
    }

    fn wrong_state(&self, action: &str) -> Error {
        Error::InvalidState(format!("cannot {action} in state {}", self.state))
    }
}

impl SmtpClient<SmtpStream> {
    /// Upgrades the session with STARTTLS. EHLO must be sent again afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if STARTTLS was not advertised, the
    /// server's rejection, or the handshake failure.
    pub async fn starttls(&mut self, host: &str, config: Arc<ClientConfig>) -> Result<()> {
        if self.state != SessionState::FeaturesKnown {
            return Err(self.wrong_state("start TLS"));
        }
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".to_string()));
        }

        self.send_command(&Command::StartTls).await?;

        // Anything already buffered was sent in plaintext and cannot be trusted.
        if self.framed.has_buffered_data() {
            self.broken = true;
            return Err(Error::MalformedResponse(
                "unexpected data after STARTTLS reply".to_string(),
            ));
        }

        let timeout = self.framed.timeout();
        if let Err(err) = self
            .framed
            .get_mut()
            .upgrade_to_tls(host, config, timeout)
            .await
        {
            self.broken = true;
            return Err(err);
        }

        info!(host, "STARTTLS negotiated");
        self.state = SessionState::Greeted;
        self.server_info.extensions.clear();
        Ok(())
    }
}
