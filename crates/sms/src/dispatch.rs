use std::sync::Arc;

use chrono::{DateTime, Utc};
use courtcall_core::clock::Clock;
use courtcall_core::errors::CourtResult;
use courtcall_core::models::club::ClubMessagingConfig;
use courtcall_core::models::outbox::{MessageKind, NewOutboxMessage, OutboundSms, OutboxMessage};
use courtcall_core::quiet_hours::defer_until_for_club;
use courtcall_core::store::Store;
use tracing::{debug, info};

/// Puts outbound texts on the outbox. Proactive texts pass the quiet-hours
/// gate first; replies go out immediately.
pub struct Dispatcher<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S: Store> Dispatcher<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Whether proactive texts for this club are currently held back.
    pub fn is_gated(&self, club: &ClubMessagingConfig) -> CourtResult<bool> {
        Ok(defer_until_for_club(club, self.clock.now())?.is_some())
    }

    /// When a proactive text queued at `at` is let through the gate, if the
    /// gate held it at all.
    pub fn release_time(
        &self,
        club: &ClubMessagingConfig,
        at: DateTime<Utc>,
    ) -> CourtResult<Option<DateTime<Utc>>> {
        defer_until_for_club(club, at)
    }

    /// Queues `sms`. Returns `None` when test mode keeps the recipient from
    /// receiving texts.
    pub async fn send(
        &self,
        club: &ClubMessagingConfig,
        sms: OutboundSms,
    ) -> CourtResult<Option<OutboxMessage>> {
        if !club.allows_recipient(&sms.to_number) {
            info!(
                club_id = %club.club_id,
                to = %sms.to_number,
                "Test mode: recipient not whitelisted, dropping text"
            );
            return Ok(None);
        }

        let from_number = club.sender_number()?.to_string();
        let now = self.clock.now();
        let send_after = match sms.kind {
            MessageKind::Reactive => now,
            MessageKind::Proactive => defer_until_for_club(club, now)?.unwrap_or(now),
        };
        if send_after > now {
            debug!(to = %sms.to_number, %send_after, "Quiet hours: text deferred");
        }

        let queued = self
            .store
            .enqueue(NewOutboxMessage {
                club_id: club.club_id,
                from_number,
                sms,
                created_at: now,
                send_after,
            })
            .await?;
        Ok(Some(queued))
    }

    pub async fn send_all(
        &self,
        club: &ClubMessagingConfig,
        messages: Vec<OutboundSms>,
    ) -> CourtResult<Vec<OutboxMessage>> {
        let mut queued = Vec::with_capacity(messages.len());
        for sms in messages {
            if let Some(message) = self.send(club, sms).await? {
                queued.push(message);
            }
        }
        Ok(queued)
    }
}
