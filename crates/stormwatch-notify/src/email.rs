//! Email alerts over an SMTP relay.
//!
//! Uses lettre's async transport with implicit TLS, the way a Gmail-style
//! relay on port 465 expects.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use stormwatch_core::{ConfigError, EmailConfig, EmailCredentials};
use tracing::instrument;

use crate::channel::{ChannelKind, NotificationChannel};
use crate::error::ChannelFault;

/// SMTP reply codes that mean the login was refused.
const AUTH_REPLY_CODES: &[&str] = &["530", "534", "535"];
/// SMTP reply codes that mean the mailbox was refused.
const RECIPIENT_REPLY_CODES: &[&str] = &["501", "550", "551", "553"];

#[derive(Clone)]
pub struct SmtpEmail {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmail {
    /// Create an email sender from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the sender address or relay host is unusable.
    pub fn new(config: &EmailConfig, credentials: &EmailCredentials) -> Result<Self, ConfigError> {
        let from: Mailbox = credentials.address.parse().map_err(|_| {
            ConfigError::Invalid(format!("EMAIL_ADDRESS {} is not a mailbox", credentials.address))
        })?;

        let smtp_credentials = Credentials::new(
            credentials.address.clone(),
            credentials.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| ConfigError::Invalid(format!("SMTP relay {}: {}", config.smtp_host, e)))?
            .port(config.smtp_port)
            .credentials(smtp_credentials)
            .build();

        Ok(Self { mailer, from })
    }

    /// Send one plain-text email. No retry.
    #[instrument(skip(self, body), level = "info")]
    pub async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, ChannelFault> {
        let email = build_message(&self.from, to, subject, body)?;

        let response = self.mailer.send(email).await.map_err(|e| classify_smtp_error(&e))?;

        let reply = response.code().to_string();
        tracing::info!("Email accepted by relay ({})", reply);
        Ok(reply)
    }
}

/// Build a plain-text message.
pub fn build_message(
    from: &Mailbox,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<Message, ChannelFault> {
    let to: Mailbox = to
        .trim()
        .parse()
        .map_err(|_| ChannelFault::InvalidRecipient(to.to_string()))?;

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| ChannelFault::Rejected {
            status: 0,
            message: format!("could not build message: {}", e),
        })
}

/// Sort an SMTP failure into a channel fault.
fn classify_smtp_error(err: &SmtpError) -> ChannelFault {
    let code = err.status().map(|c| c.to_string());
    classify_reply(code.as_deref(), err.is_permanent(), err.to_string())
}

fn classify_reply(code: Option<&str>, permanent: bool, message: String) -> ChannelFault {
    match code {
        Some(c) if AUTH_REPLY_CODES.contains(&c) => ChannelFault::Authentication(message),
        Some(c) if RECIPIENT_REPLY_CODES.contains(&c) => ChannelFault::InvalidRecipient(message),
        Some(c) if permanent => ChannelFault::Rejected {
            status: c.parse().unwrap_or(0),
            message,
        },
        _ => ChannelFault::Network(message),
    }
}

#[async_trait]
impl NotificationChannel for SmtpEmail {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, ChannelFault> {
        self.send_email(recipient, subject, body).await
    }
}
