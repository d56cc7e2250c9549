//! Outbound mail: a transport trait with SMTP, console and in-memory backends

pub mod templates;

use crate::core::config::{MailBackendKind, MailConfig, SmtpConfig};
use crate::core::error::MailError;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

/// A rendered two-part message ready for a transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub from_email: String,
    pub recipients: Vec<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `email`, returning the number of messages sent
    async fn send(&self, email: &OutgoingEmail) -> Result<usize, MailError>;
}

/// Build the transport selected by `[mail] backend`
pub fn mailer_from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    match config.backend {
        MailBackendKind::Console => Ok(Arc::new(ConsoleMailer)),
        MailBackendKind::Smtp => {
            let Some(smtp) = &config.smtp else {
                bail!("mail.smtp section is required when backend is 'smtp'");
            };
            let mailer = SmtpMailer::new(smtp).context("Failed to create SMTP transport")?;
            Ok(Arc::new(mailer))
        }
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let builder = builder.port(config.port);
        let builder = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|_| MailError::InvalidAddress(address.to_string()))
}

fn build_message(email: &OutgoingEmail) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&email.from_email)?)
        .subject(email.subject.clone());
    for recipient in &email.recipients {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            email.text_body.clone(),
            email.html_body.clone(),
        ))
        .map_err(|e| MailError::Message(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<usize, MailError> {
        let message = build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(1)
    }
}

/// Writes messages to the log instead of delivering them
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<usize, MailError> {
        build_message(email)?;
        info!(
            from = %email.from_email,
            to = ?email.recipients,
            subject = %email.subject,
            body = %email.text_body,
            "Email (console backend)"
        );
        Ok(1)
    }
}

/// Keeps sent messages in memory; can be switched to fail every send
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<OutgoingEmail>>,
    failing: AtomicBool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outbox(&self) -> Vec<OutgoingEmail> {
        self.outbox.lock().map(|outbox| outbox.clone()).unwrap_or_default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<usize, MailError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        build_message(email)?;
        self.outbox
            .lock()
            .map_err(|_| MailError::Transport("outbox poisoned".to_string()))?
            .push(email.clone());
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutgoingEmail {
        OutgoingEmail {
            subject: "1-Click Email Verification".to_string(),
            text_body: "text".to_string(),
            html_body: "<p>html</p>".to_string(),
            from_email: "noreply@dabuch.com".to_string(),
            recipients: vec!["a@x.com".to_string()],
        }
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let mut email = sample();
        email.recipients = vec!["not an address".to_string()];

        match build_message(&email) {
            Err(MailError::InvalidAddress(addr)) => assert_eq!(addr, "not an address"),
            other => panic!("Expected InvalidAddress, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_build_message_is_multipart() {
        let message = build_message(&sample()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("text/html"));
    }

    #[tokio::test]
    async fn test_memory_mailer_records_messages() {
        let mailer = MemoryMailer::new();
        assert_eq!(mailer.send(&sample()).await.unwrap(), 1);
        assert_eq!(mailer.outbox(), vec![sample()]);
    }

    #[tokio::test]
    async fn test_memory_mailer_failure_mode() {
        let mailer = MemoryMailer::new();
        mailer.set_failing(true);

        assert!(matches!(
            mailer.send(&sample()).await,
            Err(MailError::Transport(_))
        ));
        assert!(mailer.outbox().is_empty());
    }

    #[tokio::test]
    async fn test_console_mailer_validates_addresses() {
        let mut email = sample();
        email.from_email = "bad".to_string();
        assert!(ConsoleMailer.send(&email).await.is_err());
        assert_eq!(ConsoleMailer.send(&sample()).await.unwrap(), 1);
    }
}
