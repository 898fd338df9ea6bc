//! Outbox delivery.
//!
//! Drains due messages through the gateway. Transient failures are retried
//! with exponential backoff and jitter; permanent failures and exhausted
//! retries mark the message failed, which also expires the invite it carried.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use courtcall_core::clock::Clock;
use courtcall_core::errors::CourtResult;
use courtcall_core::models::outbox::OutboxMessage;
use courtcall_core::store::Store;
use rand::Rng;
use tracing::{error, info, warn};

use crate::config::SmsConfig;
use crate::gateway::{GatewayError, SmsGateway};

/// Largest power of two applied to the base delay.
const MAX_BACKOFF_EXPONENT: u32 = 6;

#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub batch_limit: usize,
}

impl From<&SmsConfig> for DeliveryPolicy {
    fn from(config: &SmsConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff_base: Duration::seconds(config.backoff_base_seconds as i64),
            batch_limit: config.batch_limit,
        }
    }
}

impl DeliveryPolicy {
    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1),
    /// plus up to a quarter of the base as jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let delay = self.backoff_base * (1i32 << exponent);
        let max_jitter = self.backoff_base.num_milliseconds() / 4;
        let jitter = if max_jitter > 0 {
            rand::thread_rng().gen_range(0..=max_jitter)
        } else {
            0
        };
        delay + Duration::milliseconds(jitter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Retrying { next_attempt_at: DateTime<Utc> },
    Failed,
    /// Dropped because the invite it carried is no longer open.
    Skipped,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub retried: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl DrainReport {
    fn record(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Delivered => self.delivered += 1,
            Delivery::Retrying { .. } => self.retried += 1,
            Delivery::Failed => self.failed += 1,
            Delivery::Skipped => self.skipped += 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub struct DeliveryWorker<S, G> {
    store: Arc<S>,
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
    policy: DeliveryPolicy,
}

impl<S, G> Clone for DeliveryWorker<S, G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            clock: self.clock.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<S: Store, G: SmsGateway> DeliveryWorker<S, G> {
    pub fn new(store: Arc<S>, gateway: Arc<G>, clock: Arc<dyn Clock>, policy: DeliveryPolicy) -> Self {
        Self {
            store,
            gateway,
            clock,
            policy,
        }
    }

    /// One pass over the due messages.
    pub async fn drain_once(&self) -> CourtResult<DrainReport> {
        let due = self
            .store
            .due_messages(self.clock.now(), self.policy.batch_limit)
            .await?;

        let mut report = DrainReport::default();
        for message in due {
            match self.deliver(&message).await {
                Ok(delivery) => report.record(delivery),
                Err(e) => error!(message_id = %message.id, error = %e, "Outbox bookkeeping failed"),
            }
        }

        if !report.is_empty() {
            info!(
                delivered = report.delivered,
                retried = report.retried,
                failed = report.failed,
                skipped = report.skipped,
                "Outbox drained"
            );
        }
        Ok(report)
    }

    async fn invite_still_open(&self, message: &OutboxMessage) -> CourtResult<bool> {
        let (Some(match_id), Some(invite_id)) = (message.match_id, message.invite_id) else {
            return Ok(true);
        };
        let Some(ledger) = self.store.load_ledger(match_id).await? else {
            return Ok(false);
        };
        Ok(ledger
            .invites
            .iter()
            .any(|i| i.id == invite_id && i.status.is_active()))
    }

    pub async fn deliver(&self, message: &OutboxMessage) -> CourtResult<Delivery> {
        if !self.invite_still_open(message).await? {
            self.store
                .mark_skipped(message.id, "invite no longer open")
                .await?;
            return Ok(Delivery::Skipped);
        }

        let result = self
            .gateway
            .send(&message.from_number, &message.to_number, &message.body)
            .await;
        let now = self.clock.now();

        match result {
            Ok(sid) => {
                self.store.mark_delivered(message.id, now).await?;
                info!(message_id = %message.id, to = %message.to_number, sid = %sid, "SMS delivered");
                if let (Some(match_id), Some(invite_id)) = (message.match_id, message.invite_id) {
                    self.store
                        .with_ledger(match_id, move |ledger| {
                            Ok(ledger.mark_dispatched(invite_id, now))
                        })
                        .await?;
                }
                Ok(Delivery::Delivered)
            }
            Err(GatewayError::Transient(reason))
                if (message.attempts as u32 + 1) < self.policy.max_attempts =>
            {
                let attempt = message.attempts as u32 + 1;
                let next_attempt_at = now + self.policy.backoff(attempt);
                self.store
                    .schedule_retry(message.id, &reason, next_attempt_at)
                    .await?;
                warn!(
                    message_id = %message.id,
                    attempt,
                    %next_attempt_at,
                    error = %reason,
                    "SMS delivery failed, will retry"
                );
                Ok(Delivery::Retrying { next_attempt_at })
            }
            Err(e) => {
                let reason = e.to_string();
                self.store.mark_failed(message.id, &reason).await?;
                error!(
                    message_id = %message.id,
                    to = %message.to_number,
                    attempts = message.attempts + 1,
                    error = %reason,
                    "SMS delivery failed permanently"
                );
                if let (Some(match_id), Some(invite_id)) = (message.match_id, message.invite_id) {
                    self.store
                        .with_ledger(match_id, move |ledger| {
                            Ok(ledger.expire_undeliverable(invite_id, now))
                        })
                        .await?;
                }
                Ok(Delivery::Failed)
            }
        }
    }
}
