//! Carrier gateway seam.
//!
//! [`HttpGateway`] talks to a Twilio-compatible REST API; [`LogGateway`] only
//! logs, for local runs without credentials.

use std::time::Duration;

use async_trait::async_trait;
use eyre::Result;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

const GATEWAY_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Worth retrying: network trouble, throttling, carrier 5xx.
    #[error("transient gateway failure: {0}")]
    Transient(String),

    /// The carrier refused the message; retrying will not help.
    #[error("gateway rejected message: {0}")]
    Permanent(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Transient(e.to_string())
    }
}

#[async_trait]
pub trait SmsGateway: Send + Sync + 'static {
    /// Sends one text and returns the carrier's message id.
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<String, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct CarrierMessage {
    sid: String,
}

pub struct HttpGateway {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, account_sid: &str, auth_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(GATEWAY_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.base_url, self.account_sid)
    }
}

pub fn classify_status(status: StatusCode, detail: String) -> GatewayError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        GatewayError::Transient(format!("{}: {}", status, detail))
    } else {
        GatewayError::Permanent(format!("{}: {}", status, detail))
    }
}

#[async_trait]
impl SmsGateway for HttpGateway {
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("From", from), ("To", to), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status, detail));
        }

        // Accepted by the carrier; an unreadable body must not trigger a resend.
        let sid = match response.json::<CarrierMessage>().await {
            Ok(message) => message.sid,
            Err(e) => {
                debug!(to = %to, error = %e, "Carrier response had no message sid");
                String::from("unknown")
            }
        };
        debug!(to = %to, sid = %sid, "Carrier accepted message");
        Ok(sid)
    }
}

/// Writes texts to the log instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct LogGateway;

#[async_trait]
impl SmsGateway for LogGateway {
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<String, GatewayError> {
        info!(from = %from, to = %to, body = %body, "SMS (log gateway)");
        Ok(format!("log-{}", Uuid::new_v4()))
    }
}
