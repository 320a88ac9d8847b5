//! Scripted in-process SMTP server for integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Installs a test log subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// How the fake server answers.
#[derive(Debug, Clone)]
pub struct ServerScript {
    pub greeting: String,
    pub extensions: Vec<String>,
    pub auth_reply: String,
    pub rejected_recipients: Vec<String>,
    pub end_of_data_reply: String,
    pub greeting_delay: Duration,
}

impl Default for ServerScript {
    fn default() -> Self {
        Self {
            greeting: "220 fake.example.com ESMTP ready".to_string(),
            extensions: Vec::new(),
            auth_reply: "235 2.7.0 Authentication successful".to_string(),
            rejected_recipients: Vec::new(),
            end_of_data_reply: "250 2.0.0 Ok: queued".to_string(),
            greeting_delay: Duration::ZERO,
        }
    }
}

impl ServerScript {
    pub fn with_extensions(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }
}

/// What one client connection sent.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Command lines without CRLF.
    pub commands: Vec<String>,
    /// Message data as received (still dot-stuffed, terminator removed).
    pub messages: Vec<Vec<u8>>,
    /// Set once the server side of the connection has finished.
    pub disconnected: bool,
}

impl Session {
    pub fn verbs(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|c| {
                let verb = c.split([' ', ':']).next().unwrap_or_default();
                verb.to_ascii_uppercase()
            })
            .collect()
    }

    pub fn message_text(&self, index: usize) -> String {
        String::from_utf8(self.messages[index].clone()).unwrap()
    }
}

#[derive(Default)]
struct Shared {
    sessions: Mutex<Vec<Session>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

/// A fake SMTP server listening on 127.0.0.1.
pub struct FakeSmtpServer {
    pub port: u16,
    shared: Arc<Shared>,
}

impl FakeSmtpServer {
    pub async fn start(script: ServerScript) -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let shared = Arc::new(Shared::default());
        let script = Arc::new(script);

        let accept_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle(stream, Arc::clone(&script), Arc::clone(&accept_shared)));
            }
        });

        Self { port, shared }
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.shared.sessions.lock().unwrap().clone()
    }

    pub fn only_session(&self) -> Session {
        let sessions = self.sessions();
        assert_eq!(sessions.len(), 1, "expected exactly one connection");
        sessions.into_iter().next().unwrap()
    }

    pub fn max_active(&self) -> usize {
        self.shared.max_active.load(Ordering::SeqCst)
    }

    /// Waits until every accepted connection has ended.
    pub async fn wait_for_disconnects(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.sessions().iter().any(|s| !s.disconnected) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("client connection still open");
    }
}

/// Returns a port on which nothing listens.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn handle(stream: TcpStream, script: Arc<ServerScript>, shared: Arc<Shared>) {
    let index = {
        let mut sessions = shared.sessions.lock().unwrap();
        sessions.push(Session::default());
        sessions.len() - 1
    };
    let active = shared.active.fetch_add(1, Ordering::SeqCst) + 1;
    shared.max_active.fetch_max(active, Ordering::SeqCst);

    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);
    let record = |f: &dyn Fn(&mut Session)| f(&mut shared.sessions.lock().unwrap()[index]);

    tokio::time::sleep(script.greeting_delay).await;
    let mut quit = false;
    if write.write_all(format!("{}\r\n", script.greeting).as_bytes()).await.is_ok() {
        let mut valid_recipients = 0;
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            record(&|s| s.commands.push(line.clone()));
            let upper = line.to_ascii_uppercase();

            let reply = if upper.starts_with("EHLO") {
                let mut lines = vec!["250-fake.example.com greets you".to_string()];
                lines.extend(script.extensions.iter().map(|e| format!("250-{e}")));
                let last = lines.pop().unwrap().replacen("250-", "250 ", 1);
                lines.push(last);
                lines.join("\r\n")
            } else if upper.starts_with("AUTH") {
                script.auth_reply.clone()
            } else if upper.starts_with("MAIL FROM") {
                valid_recipients = 0;
                "250 2.1.0 Ok".to_string()
            } else if upper.starts_with("RCPT TO") {
                let address = line
                    .split_once('<')
                    .and_then(|(_, rest)| rest.split_once('>'))
                    .map(|(address, _)| address.to_string())
                    .unwrap_or_default();
                if script.rejected_recipients.contains(&address) {
                    format!("550 5.1.1 <{address}>: Recipient address rejected")
                } else {
                    valid_recipients += 1;
                    "250 2.1.5 Ok".to_string()
                }
            } else if upper == "DATA" {
                if valid_recipients == 0 {
                    "554 5.5.1 Error: no valid recipients".to_string()
                } else {
                    if write.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").await.is_err() {
                        break;
                    }
                    let mut data = Vec::new();
                    let mut complete = false;
                    loop {
                        let mut chunk = Vec::new();
                        match reader.read_until(b'\n', &mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(_) => {}
                        }
                        if chunk == b".\r\n" {
                            complete = true;
                            break;
                        }
                        data.extend_from_slice(&chunk);
                    }
                    if !complete {
                        break;
                    }
                    record(&|s| s.messages.push(data.clone()));
                    script.end_of_data_reply.clone()
                }
            } else if upper == "RSET" || upper == "NOOP" {
                "250 2.0.0 Ok".to_string()
            } else if upper == "QUIT" {
                // Leaving before the reply: the client holds its slot until 221 arrives.
                shared.active.fetch_sub(1, Ordering::SeqCst);
                quit = true;
                let _ = write.write_all(b"221 2.0.0 Bye\r\n").await;
                break;
            } else {
                "502 5.5.2 Error: command not recognized".to_string()
            };

            if write.write_all(format!("{reply}\r\n").as_bytes()).await.is_err() {
                break;
            }
        }
    }

    if !quit {
        shared.active.fetch_sub(1, Ordering::SeqCst);
    }
    record(&|s| s.disconnected = true);
}
