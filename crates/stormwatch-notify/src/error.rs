//! Per-channel delivery faults.

use stormwatch_core::AppError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelFault {
    /// Recipient failed local checks; nothing was sent.
    #[error("validation: {0}")]
    Validation(String),

    #[error("authentication: {0}")]
    Authentication(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("network: {0}")]
    Network(String),

    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ChannelFault {
    /// Whether the fault came from local validation (no network call was made).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<reqwest::Error> for ChannelFault {
    fn from(e: reqwest::Error) -> Self {
        ChannelFault::Network(e.to_string())
    }
}

impl From<ChannelFault> for AppError {
    fn from(e: ChannelFault) -> Self {
        match e {
            ChannelFault::Validation(msg) => AppError::Validation(msg),
            other => AppError::Channel(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_display_is_tagged_with_kind() {
        assert_eq!(
            ChannelFault::Validation("phone must start with '+'".into()).to_string(),
            "validation: phone must start with '+'"
        );
        assert_eq!(
            ChannelFault::Rejected {
                status: 400,
                message: "bad body".into()
            }
            .to_string(),
            "rejected (400): bad body"
        );
    }

    #[test]
    fn test_is_validation() {
        assert!(ChannelFault::Validation("x".into()).is_validation());
        assert!(!ChannelFault::Network("x".into()).is_validation());
    }

    #[test]
    fn test_app_error_mapping() {
        let app: AppError = ChannelFault::Validation("bad email".into()).into();
        assert!(matches!(app, AppError::Validation(_)));

        let app: AppError = ChannelFault::Authentication("535".into()).into();
        assert!(matches!(app, AppError::Channel(_)));
    }
}
