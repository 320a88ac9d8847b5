//! `SendmailMailer` tests with stand-in shell scripts.

#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use mailwright::{Error, Mailer, MessageFields, SendmailConfig, SendmailMailer};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn mailer(path: PathBuf) -> SendmailMailer {
    SendmailMailer::new(SendmailConfig {
        path,
        ..SendmailConfig::default()
    })
}

// Scripts are written up front and run one after another: executing a file
// while another thread still has it open for writing fails with ETXTBSY.
#[tokio::test]
async fn sendmail_backend() {
    common::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path();

    let recording = write_script(
        out,
        "sendmail-ok",
        &format!(
            "printf '%s\\n' \"$@\" > '{args}'\ncat > '{stdin}'",
            args = out.join("args").display(),
            stdin = out.join("stdin").display(),
        ),
    );
    let failing = write_script(
        out,
        "sendmail-fail",
        "cat > /dev/null\necho 'sendmail: fatal: recipient refused' >&2\necho >&2\nexit 75",
    );

    // Successful run: flags, recipients in To/Cc/Bcc order, Bcc stripped.
    let ok = mailer(recording);
    let message = ok
        .create_message(
            MessageFields::new()
                .sender("sender@example.com".parse().unwrap())
                .to("to@example.com".parse().unwrap())
                .cc("cc@example.com".parse().unwrap())
                .bcc("hidden@example.com".parse().unwrap())
                .subject("Piped")
                .plain_body("hello"),
        )
        .unwrap();
    ok.deliver_one(message).await.unwrap();

    let args = fs::read_to_string(out.join("args")).unwrap();
    assert_eq!(
        args.lines().collect::<Vec<_>>(),
        vec![
            "-i",
            "-B",
            "8BITMIME",
            "to@example.com",
            "cc@example.com",
            "hidden@example.com"
        ]
    );
    let stdin = fs::read_to_string(out.join("stdin")).unwrap();
    assert!(stdin.starts_with("Subject: Piped\r\n"));
    assert!(!stdin.contains("hidden@example.com"));
    assert!(stdin.ends_with("\r\n\r\nhello\r\n"));

    // Failing run: trimmed stderr becomes the error text.
    let bad = mailer(failing);
    let message = bad
        .create_message(
            MessageFields::new()
                .to("to@example.com".parse().unwrap())
                .subject("Refused")
                .plain_body("x"),
        )
        .unwrap();
    let err = bad.deliver_one(message).await.unwrap_err();

    assert!(matches!(err.error(), Error::Sendmail(text) if text == "sendmail: fatal: recipient refused"));
    assert_eq!(
        err.to_string(),
        "error sending mail message: sendmail: fatal: recipient refused"
    );
    assert_eq!(err.into_message().unwrap().subject(), Some("Refused"));
}
