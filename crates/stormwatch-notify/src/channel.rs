use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChannelFault;

/// An independent notification medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Sms,
    Email,
}

impl ChannelKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where an alert goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    pub email: String,
}

impl Contact {
    pub fn new(phone: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            email: email.into(),
        }
    }

    /// Recipient address for `kind`
    pub fn recipient(&self, kind: ChannelKind) -> &str {
        match kind {
            ChannelKind::Sms => &self.phone,
            ChannelKind::Email => &self.email,
        }
    }
}

/// Minimal check before any SMS is attempted.
pub fn validate_phone(phone: &str) -> Result<(), ChannelFault> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ChannelFault::Validation("phone number is empty".into()));
    }
    if !phone.starts_with('+') {
        return Err(ChannelFault::Validation(format!(
            "phone number {} must start with '+' (international format)",
            phone
        )));
    }
    Ok(())
}

/// Minimal check before any email is attempted.
pub fn validate_email(email: &str) -> Result<(), ChannelFault> {
    if !email.contains('@') {
        return Err(ChannelFault::Validation(format!(
            "email address {:?} must contain '@'",
            email.trim()
        )));
    }
    Ok(())
}

/// A delivery backend for one channel.
///
/// Implementations make exactly one attempt per call and return a provider
/// receipt (message id or server reply) on success.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn send(&self, recipient: &str, subject: &str, body: &str)
        -> Result<String, ChannelFault>;
}
