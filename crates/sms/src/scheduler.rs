//! Batch scheduler.
//!
//! One timer task per pending match. Each tick asks the ranker for the next
//! slice of candidates and records them as a new batch; the batch's round key
//! (`match_id:round`) makes a repeated tick a no-op. The task stops once the
//! match leaves pending, fills up, or runs out of candidates.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use courtcall_core::clock::Clock;
use courtcall_core::errors::{CourtError, CourtResult};
use courtcall_core::models::court_match::MatchStatus;
use courtcall_core::models::invite::Invite;
use courtcall_core::models::outbox::OutboundSms;
use courtcall_core::store::{CandidateRanker, RankCriteria, Store};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::dispatch::Dispatcher;
use crate::replies;

/// Wait before retrying a round that failed or was aborted.
const RETRY_DELAY_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    Fired { round: i32, invited: Vec<Uuid> },
    /// Another tick already recorded this round.
    AlreadyFired { round: i32 },
    NotDue { due_at: DateTime<Utc> },
    /// The match no longer needs invites.
    Stopped,
    /// The ranker has nobody left to offer.
    Exhausted,
}

pub struct BatchScheduler<S, R> {
    store: Arc<S>,
    ranker: Arc<R>,
    dispatcher: Dispatcher<S>,
    clock: Arc<dyn Clock>,
    timers: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl<S, R> Clone for BatchScheduler<S, R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ranker: self.ranker.clone(),
            dispatcher: self.dispatcher.clone(),
            clock: self.clock.clone(),
            timers: self.timers.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }
}

impl<S: Store, R: CandidateRanker> BatchScheduler<S, R> {
    pub fn new(
        store: Arc<S>,
        ranker: Arc<R>,
        dispatcher: Dispatcher<S>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            store,
            ranker,
            dispatcher,
            clock,
            timers: Arc::new(Mutex::new(HashMap::new())),
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Runs one scheduling tick for `match_id`. Safe to call repeatedly and
    /// concurrently.
    pub async fn run_round(&self, match_id: Uuid) -> CourtResult<RoundOutcome> {
        let ledger = self
            .store
            .load_ledger(match_id)
            .await?
            .ok_or_else(|| CourtError::NotFound(format!("Match {} not found", match_id)))?;

        if ledger.status() != MatchStatus::Pending || ledger.open_seats() == 0 {
            return Ok(RoundOutcome::Stopped);
        }

        let club_id = ledger.court_match.club_id;
        let club = self
            .store
            .club(club_id)
            .await?
            .ok_or_else(|| CourtError::NotFound(format!("Club {} not found", club_id)))?;
        if let Err(e) = club.validate() {
            error!(club_id = %club_id, match_id = %match_id, error = %e, "Scheduling suspended");
            return Err(e);
        }

        let now = self.clock.now();
        let timeout = Duration::minutes(club.invite_timeout_minutes);
        // A batch created in quiet hours only reaches phones when the window
        // closes; its timeout runs from then.
        let released_at = match ledger.last_batch() {
            Some(batch) => self.dispatcher.release_time(&club, batch.created_at)?,
            None => None,
        };
        if let Some(due_at) = ledger.next_round_due_at(timeout, released_at) {
            if now < due_at {
                return Ok(RoundOutcome::NotDue { due_at });
            }
        }

        let round = ledger.last_round() + 1;
        let exclude = ledger.excluded_players();
        let criteria = RankCriteria {
            scheduled_at: ledger.court_match.scheduled_at,
            limit: club.initial_batch_size,
        };
        let mut seen = HashSet::new();
        let candidates: Vec<Uuid> = self
            .ranker
            .rank_candidates(club_id, &criteria, &exclude)
            .await?
            .into_iter()
            .filter(|p| !exclude.contains(p) && seen.insert(*p))
            .take(club.initial_batch_size)
            .collect();

        if candidates.is_empty() {
            warn!(match_id = %match_id, round, "Candidate pool exhausted, match stays pending");
            return Ok(RoundOutcome::Exhausted);
        }

        let gated = self.dispatcher.is_gated(&club)?;
        let recorded = self
            .store
            .with_ledger(match_id, move |ledger| {
                let Some(batch_id) = ledger.start_round(round, now)? else {
                    return Ok(None);
                };
                let invites = candidates
                    .into_iter()
                    .map(|player| ledger.create_invite(player, Some(batch_id), gated, now))
                    .collect::<CourtResult<Vec<Invite>>>()?;
                Ok(Some((invites, ledger.open_seats())))
            })
            .await;

        let (invites, open_seats) = match recorded {
            Ok(Some(recorded)) => recorded,
            Ok(None) => {
                debug!(match_id = %match_id, round, "Round already recorded");
                return Ok(RoundOutcome::AlreadyFired { round });
            }
            Err(CourtError::MatchClosed { .. }) => return Ok(RoundOutcome::Stopped),
            Err(e) => return Err(e),
        };

        info!(
            match_id = %match_id,
            round,
            invites = invites.len(),
            gated,
            "Invite batch created"
        );

        let when = replies::format_when(ledger.court_match.scheduled_at, club.tz()?);
        for invite in &invites {
            let Some(player) = self.store.player(invite.player_id).await? else {
                warn!(player_id = %invite.player_id, "Invited player has no directory entry");
                continue;
            };
            let body = replies::invite(&club.name, ledger.court_match.number, &when, open_seats);
            let sms = OutboundSms::notice(player.phone_number, body).for_invite(match_id, invite.id);
            self.dispatcher.send(&club, sms).await?;
        }

        Ok(RoundOutcome::Fired {
            round,
            invited: invites.iter().map(|i| i.player_id).collect(),
        })
    }

    /// Starts (or restarts) the timer task for `match_id`.
    pub fn arm(&self, match_id: Uuid) {
        let scheduler = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                let wait = match scheduler.run_round(match_id).await {
                    Ok(RoundOutcome::Fired { .. }) | Ok(RoundOutcome::AlreadyFired { .. }) => {
                        continue;
                    }
                    Ok(RoundOutcome::NotDue { due_at }) => due_at - scheduler.clock.now(),
                    Ok(RoundOutcome::Stopped) | Ok(RoundOutcome::Exhausted) => break,
                    Err(CourtError::DuplicateActiveInvite { player_id, .. }) => {
                        warn!(match_id = %match_id, player_id = %player_id, "Duplicate invite, round aborted");
                        Duration::seconds(RETRY_DELAY_SECS)
                    }
                    Err(CourtError::Configuration(_)) | Err(CourtError::NotFound(_)) => break,
                    Err(e) => {
                        error!(match_id = %match_id, error = %e, "Scheduling tick failed");
                        Duration::seconds(RETRY_DELAY_SECS)
                    }
                };

                let wait = wait.to_std().unwrap_or_default();
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!(match_id = %match_id, "Scheduler task finished");
        });

        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = timers.insert(match_id, handle) {
            previous.abort();
        }
    }

    pub fn disarm(&self, match_id: Uuid) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = timers.remove(&match_id) {
            handle.abort();
        }
    }

    pub fn is_armed(&self, match_id: Uuid) -> bool {
        let timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.get(&match_id).is_some_and(|h| !h.is_finished())
    }

    /// Re-arms every pending match, e.g. after a restart. Each task works out
    /// its remaining delay from the last batch.
    pub async fn resume_pending(&self) -> CourtResult<usize> {
        let pending = self.store.matches_with_status(MatchStatus::Pending).await?;
        for court_match in &pending {
            self.arm(court_match.id);
        }
        info!(count = pending.len(), "Resumed batch scheduling");
        Ok(pending.len())
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
