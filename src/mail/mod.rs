//! Outbound email for StudyOlle.
//!
//! Services depend on the [`EmailSender`] trait. Production uses
//! [`SmtpEmailSender`] (lettre); a disabled mail config falls back to
//! [`LogEmailSender`]; tests inspect [`InMemoryEmailSender`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{error, info};

use crate::config::MailConfig;
use crate::{Result, StudyOlleError};

/// A plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Something that can deliver an [`EmailMessage`].
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<()>;
}

/// SMTP delivery through lettre.
#[derive(Clone)]
pub struct SmtpEmailSender {
    mailer: SmtpTransport,
    from: String,
}

impl SmtpEmailSender {
    /// Build the transport from configuration.
    ///
    /// Without credentials the connection is unauthenticated and plain
    /// (local relays, MailDev); otherwise STARTTLS with login.
    pub fn new(config: &MailConfig) -> Result<Self> {
        let mailer = if config.smtp_username.is_empty() || config.smtp_password.is_empty() {
            info!(
                smtp_host = %config.smtp_host,
                smtp_port = config.smtp_port,
                "SMTP credentials not configured, using unauthenticated connection"
            );
            SmtpTransport::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            info!(
                smtp_host = %config.smtp_host,
                smtp_port = config.smtp_port,
                from = %config.from_address,
                "SMTP mailer initialized with authentication"
            );
            let creds =
                Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
            SmtpTransport::relay(&config.smtp_host)
                .map_err(|e| StudyOlleError::Mail(e.to_string()))?
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self {
            mailer,
            from: config.from_address.clone(),
        })
    }

    fn build(&self, message: &EmailMessage) -> Result<Message> {
        let from = self
            .from
            .parse()
            .map_err(|e| StudyOlleError::Mail(format!("invalid from address: {e}")))?;
        let to = message
            .to
            .parse()
            .map_err(|e| StudyOlleError::Mail(format!("invalid recipient: {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| StudyOlleError::Mail(e.to_string()))
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let email = self.build(&message)?;
        let mailer = self.mailer.clone();

        // SmtpTransport blocks; keep it off the async workers.
        let sent = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| StudyOlleError::Mail(e.to_string()))?;

        match sent {
            Ok(_) => {
                info!(to = %message.to, subject = %message.subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, to = %message.to, "Failed to send email via SMTP");
                Err(StudyOlleError::Mail(e.to_string()))
            }
        }
    }
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Mail delivery disabled, logging message"
        );
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct InMemoryEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
    offline: AtomicBool,
}

impl InMemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Messages sent to `to`.
    pub fn sent_to(&self, to: &str) -> Vec<EmailMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.to == to)
            .collect()
    }

    /// While offline every send fails with a mail error and nothing is
    /// recorded.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Forget all recorded messages.
    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl EmailSender for InMemoryEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StudyOlleError::Mail(format!(
                "mail server unavailable, cannot send to {}",
                message.to
            )));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
        Ok(())
    }
}

/// Pick the sender for a mail configuration.
pub fn sender_from_config(config: &MailConfig) -> Result<Arc<dyn EmailSender>> {
    if config.enabled {
        Ok(Arc::new(SmtpEmailSender::new(config)?))
    } else {
        info!("Mail delivery disabled, emails will be logged");
        Ok(Arc::new(LogEmailSender))
    }
}
