//! Twilio SMS client.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use stormwatch_core::{SmsConfig, TwilioCredentials};
use tracing::instrument;

use crate::channel::{ChannelKind, NotificationChannel};
use crate::error::ChannelFault;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Twilio error codes that mean the destination number itself was refused.
const RECIPIENT_ERROR_CODES: &[u32] = &[21211, 21408, 21610, 21612, 21614];

/// Message resource returned by Twilio on success.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsReceipt {
    pub sid: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    code: Option<u32>,
    message: Option<String>,
}

pub struct TwilioSms {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
}

impl TwilioSms {
    pub fn new(config: &SmsConfig, credentials: &TwilioCredentials) -> Result<Self, ChannelFault> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            account_sid: credentials.account_sid.clone(),
            auth_token: credentials.auth_token.clone(),
            from_number: credentials.from_number.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }

    /// Send one SMS. No retry.
    #[instrument(skip(self, body), level = "info")]
    pub async fn send_sms(&self, to: &str, body: &str) -> Result<SmsReceipt, ChannelFault> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await?;

        let receipt: SmsReceipt = self.handle_response(response).await?;
        tracing::info!("SMS accepted by Twilio: {}", receipt.sid);
        Ok(receipt)
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ChannelFault> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ChannelFault::Network(format!("unreadable Twilio response: {}", e)));
        }

        let text = response.text().await.unwrap_or_default();
        let parsed: Option<TwilioErrorBody> = serde_json::from_str(&text).ok();
        let code = parsed.as_ref().and_then(|b| b.code);
        let message = parsed
            .and_then(|b| b.message)
            .unwrap_or_else(|| text.clone());

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ChannelFault::Authentication(message)
            }
            _ if code.is_some_and(|c| RECIPIENT_ERROR_CODES.contains(&c)) => {
                ChannelFault::InvalidRecipient(message)
            }
            _ => ChannelFault::Rejected {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl NotificationChannel for TwilioSms {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(
        &self,
        recipient: &str,
        _subject: &str,
        body: &str,
    ) -> Result<String, ChannelFault> {
        self.send_sms(recipient, body).await.map(|r| r.sid)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC123/Messages.json";

    fn client(base_url: &str) -> TwilioSms {
        let config = SmsConfig {
            api_base_url: base_url.to_string(),
        };
        let credentials = TwilioCredentials {
            account_sid: "AC123".to_string(),
            auth_token: SecretString::from("secret".to_string()),
            from_number: "+15550001111".to_string(),
        };
        TwilioSms::new(&config, &credentials).unwrap()
    }

    #[tokio::test]
    async fn test_send_sms_success() {
        let mock_server = MockServer::start().await;

        // "AC123:secret" in base64
        Mock::given(method("POST"))
            .and(path(MESSAGES_PATH))
            .and(header("Authorization", "Basic QUMxMjM6c2VjcmV0"))
            .and(body_string_contains("To=%2B15551234567"))
            .and(body_string_contains("From=%2B15550001111"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "SM42",
                "status": "queued"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let receipt = client(&mock_server.uri())
            .send_sms("+15551234567", "Storm warning")
            .await
            .unwrap();

        assert_eq!(receipt.sid, "SM42");
        assert_eq!(receipt.status.as_deref(), Some("queued"));
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MESSAGES_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "code": 20003,
                "message": "Authenticate",
                "status": 401
            })))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server.uri()).send_sms("+15551234567", "hi").await;
        assert_eq!(result.unwrap_err(), ChannelFault::Authentication("Authenticate".into()));
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MESSAGES_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 21211,
                "message": "The 'To' number +1555 is not a valid phone number.",
                "status": 400
            })))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server.uri()).send_sms("+1555", "hi").await;
        assert!(matches!(result, Err(ChannelFault::InvalidRecipient(_))));
    }

    #[tokio::test]
    async fn test_other_rejection_keeps_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MESSAGES_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client(&mock_server.uri()).send_sms("+15551234567", "hi").await;
        assert_eq!(
            result.unwrap_err(),
            ChannelFault::Rejected {
                status: 500,
                message: "upstream exploded".into()
            }
        );
    }

    #[tokio::test]
    async fn test_channel_trait_returns_sid() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MESSAGES_PATH))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "SM7"
            })))
            .mount(&mock_server)
            .await;

        let sms = client(&mock_server.uri());
        assert_eq!(sms.kind(), ChannelKind::Sms);
        assert_eq!(sms.send("+15551234567", "ignored", "body").await.unwrap(), "SM7");
    }
}
