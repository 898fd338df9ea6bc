//! Engine facade.
//!
//! Wires the dispatcher, router and both schedulers over one store and exposes
//! the operations the HTTP layer calls.

use std::sync::Arc;

use courtcall_core::clock::Clock;
use courtcall_core::errors::{CourtError, CourtResult};
use courtcall_core::ledger::MatchLedger;
use courtcall_core::models::club::ClubMessagingConfig;
use courtcall_core::models::court_match::{CourtMatch, CreateMatchRequest, MATCH_CAPACITY, MatchStatus};
use courtcall_core::models::feedback::ResendFeedbackResponse;
use courtcall_core::models::outbox::{OutboundSms, OutboxMessage};
use courtcall_core::store::{CandidateRanker, Store};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dispatch::Dispatcher;
use crate::feedback::FeedbackScheduler;
use crate::replies;
use crate::router::{Router, notify_players};
use crate::scheduler::{BatchScheduler, RoundOutcome};

pub struct Engine<S, R> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    dispatcher: Dispatcher<S>,
    scheduler: BatchScheduler<S, R>,
    feedback: FeedbackScheduler<S>,
    router: Router<S, R>,
}

impl<S, R> Clone for Engine<S, R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            dispatcher: self.dispatcher.clone(),
            scheduler: self.scheduler.clone(),
            feedback: self.feedback.clone(),
            router: self.router.clone(),
        }
    }
}

impl<S: Store, R: CandidateRanker> Engine<S, R> {
    pub fn new(store: Arc<S>, ranker: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        let dispatcher = Dispatcher::new(store.clone(), clock.clone());
        let scheduler =
            BatchScheduler::new(store.clone(), ranker, dispatcher.clone(), clock.clone());
        let feedback = FeedbackScheduler::new(store.clone(), dispatcher.clone(), clock.clone());
        let router = Router::new(
            store.clone(),
            dispatcher.clone(),
            scheduler.clone(),
            clock.clone(),
        );

        Self {
            store,
            clock,
            dispatcher,
            scheduler,
            feedback,
            router,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn scheduler(&self) -> &BatchScheduler<S, R> {
        &self.scheduler
    }

    pub fn feedback(&self) -> &FeedbackScheduler<S> {
        &self.feedback
    }

    async fn club(&self, club_id: Uuid) -> CourtResult<ClubMessagingConfig> {
        self.store
            .club(club_id)
            .await?
            .ok_or_else(|| CourtError::NotFound(format!("Club {} not found", club_id)))
    }

    pub async fn ledger(&self, match_id: Uuid) -> CourtResult<MatchLedger> {
        self.store
            .load_ledger(match_id)
            .await?
            .ok_or_else(|| CourtError::NotFound(format!("Match {} not found", match_id)))
    }

    async fn ensure_member(&self, club_id: Uuid, player_id: Uuid) -> CourtResult<()> {
        match self.store.player(player_id).await? {
            Some(player) if player.club_id == club_id => Ok(()),
            Some(_) => Err(CourtError::Validation(format!(
                "Player {} is not a member of club {}",
                player_id, club_id
            ))),
            None => Err(CourtError::NotFound(format!("Player {} not found", player_id))),
        }
    }

    async fn notify(
        &self,
        club: &ClubMessagingConfig,
        court_match: &CourtMatch,
        player_ids: &[Uuid],
        body: &str,
    ) -> CourtResult<Vec<OutboxMessage>> {
        let messages: Vec<OutboundSms> =
            notify_players(&*self.store, court_match, player_ids, body, None).await?;
        self.dispatcher.send_all(club, messages).await
    }

    async fn announce_confirmed(&self, ledger: &MatchLedger) -> CourtResult<()> {
        self.scheduler.disarm(ledger.match_id());
        let club = self.club(ledger.court_match.club_id).await?;
        let when = replies::format_when(ledger.court_match.scheduled_at, club.tz()?);
        let seated: Vec<Uuid> = ledger.court_match.seated().copied().collect();
        self.notify(
            &club,
            &ledger.court_match,
            &seated,
            &replies::confirmed_notice(ledger.court_match.number, &when),
        )
        .await?;
        Ok(())
    }

    /// Creates a match request, seats the originator and any directly
    /// assigned players, fires the first invite round and arms the timer.
    pub async fn create_match(&self, request: CreateMatchRequest) -> CourtResult<MatchLedger> {
        let club = self.club(request.club_id).await?;
        club.validate()?;

        let now = self.clock.now();
        if request.scheduled_at <= now {
            return Err(CourtError::Validation(
                "scheduled_at must be in the future".to_string(),
            ));
        }

        let mut seats: Vec<Uuid> = Vec::new();
        for id in request.originator_id.iter().chain(request.player_ids.iter()) {
            if !seats.contains(id) {
                seats.push(*id);
            }
        }
        if seats.len() > MATCH_CAPACITY {
            return Err(CourtError::Validation(format!(
                "A match seats at most {} players, got {}",
                MATCH_CAPACITY,
                seats.len()
            )));
        }
        for id in &seats {
            self.ensure_member(club.club_id, *id).await?;
        }

        let court_match = self
            .store
            .create_match(club.club_id, request.scheduled_at, request.originator_id, now)
            .await?;
        info!(match_id = %court_match.id, number = court_match.number, club_id = %club.club_id, "Match created");

        if !seats.is_empty() {
            let confirmed = self
                .store
                .with_ledger(court_match.id, move |ledger| {
                    for player_id in seats {
                        ledger.add_participant(player_id, now)?;
                    }
                    Ok(ledger.status() == MatchStatus::Confirmed)
                })
                .await?;
            if confirmed {
                self.announce_confirmed(&self.ledger(court_match.id).await?).await?;
            }
        }

        match self.scheduler.run_round(court_match.id).await {
            Ok(RoundOutcome::Stopped) | Ok(RoundOutcome::Exhausted) => {}
            Ok(_) => self.scheduler.arm(court_match.id),
            Err(e @ (CourtError::Configuration(_) | CourtError::NotFound(_))) => {
                error!(match_id = %court_match.id, error = %e, "First invite round failed");
            }
            Err(e) => {
                warn!(match_id = %court_match.id, error = %e, "First invite round failed, retrying on timer");
                self.scheduler.arm(court_match.id);
            }
        }

        self.ledger(court_match.id).await
    }

    /// Seats a player directly, without an invite round trip.
    pub async fn assign_player(&self, match_id: Uuid, player_id: Uuid) -> CourtResult<MatchLedger> {
        let ledger = self.ledger(match_id).await?;
        self.ensure_member(ledger.court_match.club_id, player_id).await?;

        let now = self.clock.now();
        let confirmed = self
            .store
            .with_ledger(match_id, move |ledger| {
                let was_pending = ledger.status() == MatchStatus::Pending;
                ledger.add_participant(player_id, now)?;
                Ok(was_pending && ledger.status() == MatchStatus::Confirmed)
            })
            .await?;

        let ledger = self.ledger(match_id).await?;
        if confirmed {
            self.announce_confirmed(&ledger).await?;
        }
        Ok(ledger)
    }

    /// Removes a player's invites and seat. A confirmed match that loses a
    /// player goes back to pending and is rescheduled.
    pub async fn remove_player(&self, match_id: Uuid, player_id: Uuid) -> CourtResult<MatchLedger> {
        let now = self.clock.now();
        let reopened = self
            .store
            .with_ledger(match_id, move |ledger| ledger.remove_player(player_id, now))
            .await?;

        let ledger = self.ledger(match_id).await?;
        info!(match_id = %match_id, player_id = %player_id, reopened, "Player removed");
        if ledger.status() == MatchStatus::Pending {
            self.scheduler.arm(match_id);
        }
        Ok(ledger)
    }

    pub async fn confirm(&self, match_id: Uuid) -> CourtResult<MatchLedger> {
        let now = self.clock.now();
        let newly_confirmed = self
            .store
            .with_ledger(match_id, move |ledger| {
                let was_pending = ledger.status() == MatchStatus::Pending;
                ledger.confirm(now)?;
                Ok(was_pending)
            })
            .await?;

        let ledger = self.ledger(match_id).await?;
        if newly_confirmed {
            info!(match_id = %match_id, players = ledger.accepted_count(), "Match confirmed manually");
            self.announce_confirmed(&ledger).await?;
        }
        Ok(ledger)
    }

    pub async fn cancel(&self, match_id: Uuid) -> CourtResult<MatchLedger> {
        let now = self.clock.now();
        let notify = self
            .store
            .with_ledger(match_id, move |ledger| ledger.cancel(now))
            .await?;
        self.scheduler.disarm(match_id);

        let ledger = self.ledger(match_id).await?;
        if !notify.is_empty() {
            let club = self.club(ledger.court_match.club_id).await?;
            let when = replies::format_when(ledger.court_match.scheduled_at, club.tz()?);
            self.notify(
                &club,
                &ledger.court_match,
                &notify,
                &replies::cancelled_notice(ledger.court_match.number, &when),
            )
            .await?;
            info!(match_id = %match_id, notified = notify.len(), "Match cancelled");
        }
        Ok(ledger)
    }

    pub async fn complete(&self, match_id: Uuid, score: Option<String>) -> CourtResult<MatchLedger> {
        self.store
            .with_ledger(match_id, move |ledger| ledger.complete(score))
            .await?;
        info!(match_id = %match_id, "Match completed");
        self.ledger(match_id).await
    }

    pub async fn resend_feedback(
        &self,
        match_id: Uuid,
        force: bool,
    ) -> CourtResult<ResendFeedbackResponse> {
        self.feedback.resend(match_id, force).await
    }

    pub async fn failed_deliveries(&self, limit: usize) -> CourtResult<Vec<OutboxMessage>> {
        self.store.failed_messages(limit).await
    }

    pub async fn handle_inbound(&self, from: &str, to: &str, body: &str) -> CourtResult<Vec<OutboundSms>> {
        self.router.receive_sms(from, to, body).await
    }

    /// Re-arms scheduling for every pending match.
    pub async fn resume(&self) -> CourtResult<usize> {
        self.scheduler.resume_pending().await
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}
