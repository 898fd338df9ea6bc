//! Collaborator seams.
//!
//! The engine consumes persistence and candidate ranking through these traits.
//! `courtcall-db` implements them for Postgres and for an in-memory store.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::CourtResult;
use crate::ledger::MatchLedger;
use crate::models::club::{ClubMessagingConfig, Player};
use crate::models::court_match::{CourtMatch, MatchStatus, PlayRequest};
use crate::models::feedback::{FeedbackEntry, FeedbackKind, FeedbackSend};
use crate::models::invite::Invite;
use crate::models::outbox::{NewOutboxMessage, OutboxMessage};

#[async_trait]
pub trait ClubDirectory: Send + Sync {
    async fn club(&self, club_id: Uuid) -> CourtResult<Option<ClubMessagingConfig>>;

    /// Resolves the club that owns an inbound `To` number.
    async fn club_by_phone(&self, phone_number: &str) -> CourtResult<Option<ClubMessagingConfig>>;

    async fn player(&self, player_id: Uuid) -> CourtResult<Option<Player>>;

    async fn player_by_phone(&self, club_id: Uuid, phone_number: &str)
    -> CourtResult<Option<Player>>;

    async fn club_players(&self, club_id: Uuid) -> CourtResult<Vec<Player>>;
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Inserts a pending match with the next club-scoped number.
    async fn create_match(
        &self,
        club_id: Uuid,
        scheduled_at: DateTime<Utc>,
        originator_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> CourtResult<CourtMatch>;

    async fn get_match(&self, match_id: Uuid) -> CourtResult<Option<CourtMatch>>;

    async fn match_by_number(&self, club_id: Uuid, number: i32) -> CourtResult<Option<CourtMatch>>;

    async fn load_ledger(&self, match_id: Uuid) -> CourtResult<Option<MatchLedger>>;

    /// Runs `f` against the match's ledger with exclusive access to that match
    /// and persists the result only if `f` succeeds and the ledger still holds
    /// its invariants. Fails with `NotFound` if the match does not exist.
    async fn with_ledger<T, F>(&self, match_id: Uuid, f: F) -> CourtResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut MatchLedger) -> CourtResult<T> + Send + 'static;

    async fn matches_with_status(&self, status: MatchStatus) -> CourtResult<Vec<CourtMatch>>;

    /// Pending matches at a club, ordered by scheduled time.
    async fn open_matches(&self, club_id: Uuid) -> CourtResult<Vec<CourtMatch>>;

    async fn invites_for_player(&self, player_id: Uuid) -> CourtResult<Vec<Invite>>;

    /// Matches the player is seated in, ordered by scheduled time.
    async fn matches_for_player(&self, player_id: Uuid) -> CourtResult<Vec<CourtMatch>>;

    async fn record_play_request(
        &self,
        club_id: Uuid,
        player_id: Uuid,
        message: &str,
        now: DateTime<Utc>,
    ) -> CourtResult<PlayRequest>;
}

#[async_trait]
pub trait OutboxStore: Send + Sync {
    async fn enqueue(&self, message: NewOutboxMessage) -> CourtResult<OutboxMessage>;

    /// Queued messages whose `send_after` has passed, ordered by
    /// `(send_after, seq)`. A message is held back while an earlier one to the
    /// same number is retrying or due no later than it, so texts to one
    /// recipient go out in creation order.
    async fn due_messages(&self, now: DateTime<Utc>, limit: usize) -> CourtResult<Vec<OutboxMessage>>;

    async fn mark_delivered(&self, id: Uuid, now: DateTime<Utc>) -> CourtResult<()>;

    /// Counts a failed attempt and pushes `send_after` to `next_attempt_at`.
    async fn schedule_retry(
        &self,
        id: Uuid,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> CourtResult<()>;

    /// Counts a failed attempt and gives up on the message.
    async fn mark_failed(&self, id: Uuid, error: &str) -> CourtResult<()>;

    async fn mark_skipped(&self, id: Uuid, reason: &str) -> CourtResult<()>;

    async fn failed_messages(&self, limit: usize) -> CourtResult<Vec<OutboxMessage>>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn feedback_responders(&self, match_id: Uuid) -> CourtResult<HashSet<Uuid>>;

    async fn record_feedback(&self, entry: FeedbackEntry) -> CourtResult<()>;

    async fn feedback_sends(&self, match_id: Uuid, kind: FeedbackKind) -> CourtResult<Vec<FeedbackSend>>;

    /// Claims the right to send `send`. Returns `false` if the player already
    /// got this kind of message for the match, unless `force` is set.
    async fn claim_feedback_send(&self, send: FeedbackSend, force: bool) -> CourtResult<bool>;

    /// Drops a claim whose text never made it onto the outbox.
    async fn release_feedback_send(
        &self,
        match_id: Uuid,
        player_id: Uuid,
        kind: FeedbackKind,
    ) -> CourtResult<()>;
}

/// Everything the engine needs from persistence.
pub trait Store: ClubDirectory + MatchStore + OutboxStore + FeedbackStore + 'static {}

impl<T> Store for T where T: ClubDirectory + MatchStore + OutboxStore + FeedbackStore + 'static {}

#[derive(Debug, Clone)]
pub struct RankCriteria {
    pub scheduled_at: DateTime<Utc>,
    pub limit: usize,
}

/// Orders invite candidates. Implementations must never return excluded
/// players; the engine treats the order as opaque.
#[async_trait]
pub trait CandidateRanker: Send + Sync + 'static {
    async fn rank_candidates(
        &self,
        club_id: Uuid,
        criteria: &RankCriteria,
        exclude: &[Uuid],
    ) -> CourtResult<Vec<Uuid>>;
}
