use std::env;
use std::str::FromStr;

use eyre::{Result, WrapErr, eyre};
use serde::Deserialize;

/// Settings for the delivery worker and the periodic sweeps.
///
/// The gateway credentials are optional: without all three of them texts are
/// written to the log instead of being sent.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    /// Base URL of the Twilio-compatible API, e.g. `https://api.twilio.com/2010-04-01`
    pub gateway_url: Option<String>,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    /// Attempts before a message is marked failed
    pub max_attempts: u32,
    /// First retry delay; doubles on every further attempt
    pub backoff_base_seconds: u64,
    pub poll_interval_seconds: u64,
    /// Messages taken from the outbox per poll
    pub batch_limit: usize,
    pub feedback_sweep_interval_seconds: u64,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            account_sid: None,
            auth_token: None,
            max_attempts: 5,
            backoff_base_seconds: 30,
            poll_interval_seconds: 5,
            batch_limit: 50,
            feedback_sweep_interval_seconds: 60,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .wrap_err_with(|| format!("{} must be a valid number, got {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

impl SmsConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            gateway_url: env::var("SMS_GATEWAY_URL").ok(),
            account_sid: env::var("SMS_ACCOUNT_SID").ok(),
            auth_token: env::var("SMS_AUTH_TOKEN").ok(),
            max_attempts: parse_var("SMS_MAX_ATTEMPTS", defaults.max_attempts)?,
            backoff_base_seconds: parse_var(
                "SMS_BACKOFF_BASE_SECONDS",
                defaults.backoff_base_seconds,
            )?,
            poll_interval_seconds: parse_var(
                "SMS_POLL_INTERVAL_SECONDS",
                defaults.poll_interval_seconds,
            )?,
            batch_limit: parse_var("SMS_BATCH_LIMIT", defaults.batch_limit)?,
            feedback_sweep_interval_seconds: parse_var(
                "FEEDBACK_SWEEP_INTERVAL_SECONDS",
                defaults.feedback_sweep_interval_seconds,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects values the workers cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(eyre!("SMS_MAX_ATTEMPTS must be at least 1"));
        }
        if self.poll_interval_seconds == 0 {
            return Err(eyre!("SMS_POLL_INTERVAL_SECONDS must be at least 1"));
        }
        if self.feedback_sweep_interval_seconds == 0 {
            return Err(eyre!("FEEDBACK_SWEEP_INTERVAL_SECONDS must be at least 1"));
        }
        if self.batch_limit == 0 {
            return Err(eyre!("SMS_BATCH_LIMIT must be at least 1"));
        }
        Ok(())
    }

    /// `(url, account sid, auth token)` when a real gateway is configured.
    pub fn gateway_credentials(&self) -> Option<(&str, &str, &str)> {
        match (&self.gateway_url, &self.account_sid, &self.auth_token) {
            (Some(url), Some(sid), Some(token)) => Some((url.as_str(), sid.as_str(), token.as_str())),
            _ => None,
        }
    }
}
