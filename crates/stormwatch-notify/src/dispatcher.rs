//! Fan an alert out to SMS and email.
//!
//! Both channels are always attempted, one after the other, and neither
//! outcome affects the other. Failures are collected as
//! `"<channel>: <kind>: <detail>"` strings instead of being returned as
//! errors so the caller can report partial success.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stormwatch_core::{Config, ConfigError, Credentials};

use crate::channel::{validate_email, validate_phone, ChannelKind, Contact, NotificationChannel};
use crate::email::SmtpEmail;
use crate::error::ChannelFault;
use crate::sms::TwilioSms;

/// Outcome of one dispatch attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub sms_sent: bool,
    pub email_sent: bool,
    pub errors: Vec<String>,
}

impl DispatchResult {
    /// At least one channel delivered
    pub fn any_sent(&self) -> bool {
        self.sms_sent || self.email_sent
    }

    /// Every channel delivered
    pub fn all_sent(&self) -> bool {
        self.sms_sent && self.email_sent
    }

    fn record(&mut self, kind: ChannelKind, outcome: Result<String, ChannelFault>) {
        let sent = match outcome {
            Ok(receipt) => {
                tracing::info!(channel = %kind, receipt = %receipt, "Alert delivered");
                true
            }
            Err(fault) => {
                tracing::warn!(channel = %kind, "Alert not delivered: {}", fault);
                self.errors.push(format!("{}: {}", kind, fault));
                false
            }
        };
        match kind {
            ChannelKind::Sms => self.sms_sent = sent,
            ChannelKind::Email => self.email_sent = sent,
        }
    }
}

pub struct Dispatcher {
    sms: Arc<dyn NotificationChannel>,
    email: Arc<dyn NotificationChannel>,
    subject: String,
}

impl Dispatcher {
    pub fn new(
        sms: Arc<dyn NotificationChannel>,
        email: Arc<dyn NotificationChannel>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            sms,
            email,
            subject: subject.into(),
        }
    }

    /// Build the Twilio and SMTP channels from startup configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if either channel cannot be set up.
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self, ConfigError> {
        let sms = TwilioSms::new(&config.sms, &credentials.twilio)
            .map_err(|e| ConfigError::Invalid(format!("SMS client: {}", e)))?;
        let email = SmtpEmail::new(&config.email, &credentials.email)?;

        Ok(Self::new(
            Arc::new(sms),
            Arc::new(email),
            config.email.subject.clone(),
        ))
    }

    /// Attempt delivery of `message` to `contact` over both channels.
    ///
    /// Each channel's kind picks the contact field it is sent to and the
    /// check applied before sending.
    pub async fn dispatch(&self, contact: &Contact, message: &str) -> DispatchResult {
        let mut result = DispatchResult::default();

        for channel in [self.sms.as_ref(), self.email.as_ref()] {
            let kind = channel.kind();
            let outcome = self.attempt(channel, contact.recipient(kind), message).await;
            result.record(kind, outcome);
        }

        result
    }

    async fn attempt(
        &self,
        channel: &dyn NotificationChannel,
        recipient: &str,
        message: &str,
    ) -> Result<String, ChannelFault> {
        let recipient = recipient.trim();
        match channel.kind() {
            ChannelKind::Sms => validate_phone(recipient)?,
            ChannelKind::Email => validate_email(recipient)?,
        }
        channel.send(recipient, &self.subject, message).await
    }
}
