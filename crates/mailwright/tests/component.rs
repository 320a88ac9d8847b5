//! Configuration-driven setup through `MailerComponent`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use mailwright::{Mailer, MailerComponent, MailerConfig, MessageFields, Resources};
use serde_json::json;

use common::{FakeSmtpServer, ServerScript};

#[tokio::test]
async fn smtp_component_from_json_delivers_with_defaults() {
    let server = FakeSmtpServer::start(ServerScript::default()).await;
    let config: MailerConfig = serde_json::from_value(json!({
        "backend": "smtp",
        "resource_name": "notifications",
        "args": {
            "host": "127.0.0.1",
            "port": server.port,
            "local_hostname": "app.test",
            "timeout": 5,
            "message_defaults": {
                "sender": "App <app@example.com>",
                "to": "ops@example.com",
                "subject": "Notification"
            }
        }
    }))
    .unwrap();

    let mut component = MailerComponent::from_config(config).unwrap();
    let mailer = component.start(&Resources::new()).await.unwrap();
    assert_eq!(
        mailer.to_string(),
        format!("SmtpMailer(host=\"127.0.0.1\", port={})", server.port)
    );

    mailer
        .create_and_deliver(MessageFields::new().plain_body("disk almost full"))
        .await
        .unwrap();

    let session = server.only_session();
    assert_eq!(
        session.commands,
        vec![
            "EHLO app.test",
            "MAIL FROM:<app@example.com>",
            "RCPT TO:<ops@example.com>",
            "DATA",
            "QUIT"
        ]
    );
    let data = session.message_text(0);
    assert!(data.starts_with("Subject: Notification\r\nFrom: App <app@example.com>\r\nTo: ops@example.com\r\n"));
}

#[tokio::test]
async fn create_and_deliver_without_body_fails() {
    let mut component = MailerComponent::new("mock", "default", json!({})).unwrap();
    let mailer = component.start(&Resources::new()).await.unwrap();

    let err = mailer
        .create_and_deliver(MessageFields::new().subject("empty"))
        .await
        .unwrap_err();
    assert!(err.message().is_none());
    assert_eq!(
        err.to_string(),
        "error sending mail message: message needs a plain text or HTML body"
    );
}
