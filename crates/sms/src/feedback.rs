//! Post-match feedback requests, reminders and manual resends.

use std::sync::Arc;

use chrono::Duration;
use courtcall_core::clock::Clock;
use courtcall_core::errors::{CourtError, CourtResult};
use courtcall_core::models::club::ClubMessagingConfig;
use courtcall_core::models::court_match::{CourtMatch, MatchStatus};
use courtcall_core::models::feedback::{FeedbackKind, FeedbackSend, ResendFeedbackResponse};
use courtcall_core::models::outbox::OutboundSms;
use courtcall_core::store::Store;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatch::Dispatcher;
use crate::replies;

pub struct FeedbackScheduler<S> {
    store: Arc<S>,
    dispatcher: Dispatcher<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for FeedbackScheduler<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            dispatcher: self.dispatcher.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S: Store> FeedbackScheduler<S> {
    pub fn new(store: Arc<S>, dispatcher: Dispatcher<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            dispatcher,
            clock,
        }
    }

    /// Sends every request and reminder that has come due. Returns the number
    /// of texts queued.
    pub async fn run_due(&self) -> CourtResult<usize> {
        let now = self.clock.now();
        let mut sent = 0;

        for court_match in self.store.matches_with_status(MatchStatus::Completed).await? {
            let Some(club) = self.store.club(court_match.club_id).await? else {
                warn!(match_id = %court_match.id, "Completed match belongs to an unknown club");
                continue;
            };
            if let Err(e) = club.validate() {
                warn!(club_id = %club.club_id, match_id = %court_match.id, error = %e, "Feedback suspended");
                continue;
            }

            let request_due = court_match.scheduled_at + Duration::hours(club.feedback_delay_hours);
            if now >= request_due {
                sent += self
                    .send_round(&court_match, &club, FeedbackKind::Request, false)
                    .await?
                    .len();
            }

            // Reminders count from the first request that actually went out.
            let first_request = self
                .store
                .feedback_sends(court_match.id, FeedbackKind::Request)
                .await?
                .into_iter()
                .map(|s| s.sent_at)
                .min();
            if let Some(requested_at) = first_request {
                let reminder_due =
                    requested_at + Duration::hours(club.feedback_reminder_delay_hours);
                if now >= reminder_due {
                    sent += self
                        .send_round(&court_match, &club, FeedbackKind::Reminder, false)
                        .await?
                        .len();
                }
            }
        }

        if sent > 0 {
            info!(sent, "Feedback sweep queued texts");
        }
        Ok(sent)
    }

    /// Texts every seated player who has not rated yet and has not already
    /// received `kind` (unless `force`). Returns who was messaged.
    pub async fn send_round(
        &self,
        court_match: &CourtMatch,
        club: &ClubMessagingConfig,
        kind: FeedbackKind,
        force: bool,
    ) -> CourtResult<Vec<Uuid>> {
        club.validate()?;
        let responders = self.store.feedback_responders(court_match.id).await?;
        let seated: Vec<Uuid> = court_match.seated().copied().collect();

        let mut roster = Vec::new();
        for player_id in &seated {
            if let Some(player) = self.store.player(*player_id).await? {
                roster.push((player.id, player.name, player.phone_number));
            }
        }

        let mut messaged = Vec::new();
        for (player_id, _, phone_number) in &roster {
            if responders.contains(player_id) {
                continue;
            }
            let claim = FeedbackSend {
                match_id: court_match.id,
                player_id: *player_id,
                kind,
                sent_at: self.clock.now(),
            };
            if !self.store.claim_feedback_send(claim, force).await? {
                debug!(match_id = %court_match.id, player_id = %player_id, kind = kind.as_str(), "Feedback already sent");
                continue;
            }

            let others: Vec<String> = roster
                .iter()
                .filter(|(id, _, _)| id != player_id)
                .map(|(_, name, _)| name.clone())
                .collect();
            let body = match kind {
                FeedbackKind::Reminder => replies::feedback_reminder(court_match.number),
                FeedbackKind::Request | FeedbackKind::Resend => {
                    replies::feedback_request(court_match.number, &others)
                }
            };
            let sms = OutboundSms::notice(phone_number.clone(), body).for_match(court_match.id);
            match self.dispatcher.send(club, sms).await {
                Ok(Some(_)) => messaged.push(*player_id),
                // Test mode dropped it; the claim stands so later sweeps stay quiet.
                Ok(None) => {}
                Err(e) => {
                    self.store
                        .release_feedback_send(court_match.id, *player_id, kind)
                        .await?;
                    return Err(e);
                }
            }
        }

        Ok(messaged)
    }

    /// Operator-triggered resend. Players who already rated are always
    /// skipped; `force` re-targets players an earlier resend reached.
    pub async fn resend(&self, match_id: Uuid, force: bool) -> CourtResult<ResendFeedbackResponse> {
        let court_match = self
            .store
            .get_match(match_id)
            .await?
            .ok_or_else(|| CourtError::NotFound(format!("Match {} not found", match_id)))?;
        if court_match.status != MatchStatus::Completed {
            return Err(CourtError::Validation(format!(
                "Feedback can only be requested for completed matches; match {} is {}",
                match_id, court_match.status
            )));
        }
        let club = self
            .store
            .club(court_match.club_id)
            .await?
            .ok_or_else(|| CourtError::NotFound(format!("Club {} not found", court_match.club_id)))?;

        let messaged = self
            .send_round(&court_match, &club, FeedbackKind::Resend, force)
            .await?;
        info!(match_id = %match_id, force, messaged = messaged.len(), "Feedback resend");

        Ok(ResendFeedbackResponse {
            match_id,
            messaged_player_ids: messaged,
        })
    }
}
