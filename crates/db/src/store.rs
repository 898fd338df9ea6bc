//! Postgres implementation of the engine's store and ranker traits.
//!
//! Ledger transitions run inside a transaction that holds the match row lock
//! (`SELECT ... FOR UPDATE`), so replies for the same match are applied one
//! at a time no matter how many API processes are running.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courtcall_core::errors::{CourtError, CourtResult};
use courtcall_core::ledger::MatchLedger;
use courtcall_core::models::club::{ClubMessagingConfig, Player};
use courtcall_core::models::court_match::{CourtMatch, MatchStatus, PlayRequest};
use courtcall_core::models::feedback::{FeedbackEntry, FeedbackKind, FeedbackSend};
use courtcall_core::models::invite::{Batch, Invite};
use courtcall_core::models::outbox::{NewOutboxMessage, OutboxMessage};
use courtcall_core::store::{
    CandidateRanker, ClubDirectory, FeedbackStore, MatchStore, OutboxStore, RankCriteria,
};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::DbPool;
use crate::models::DbMatch;
use crate::repositories::{batch, club, court_match, feedback, invite, outbox, player};

fn db_error(e: sqlx::Error) -> CourtError {
    CourtError::Database(e.into())
}

fn limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_matches(rows: Vec<DbMatch>) -> CourtResult<Vec<CourtMatch>> {
    rows.into_iter()
        .map(|row| CourtMatch::try_from(row).map_err(CourtError::from))
        .collect()
}

async fn read_ledger(conn: &mut PgConnection, row: DbMatch) -> CourtResult<MatchLedger> {
    let court_match = CourtMatch::try_from(row)?;
    let invites = invite::get_match_invites(&mut *conn, court_match.id)
        .await?
        .into_iter()
        .map(Invite::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let batches = batch::get_match_batches(&mut *conn, court_match.id)
        .await?
        .into_iter()
        .map(Batch::from)
        .collect();

    Ok(MatchLedger {
        court_match,
        invites,
        batches,
    })
}

// Writes only what the transition touched. Existing invites are updated
// before new ones are inserted so the one-active-invite index never sees two.
async fn persist_changes(
    conn: &mut PgConnection,
    before: &MatchLedger,
    after: &MatchLedger,
) -> CourtResult<i64> {
    for b in &after.batches {
        if !before.batches.contains(b) {
            batch::upsert_batch(&mut *conn, b).await?;
        }
    }

    let (existing, new): (Vec<&Invite>, Vec<&Invite>) = after
        .invites
        .iter()
        .filter(|i| !before.invites.contains(*i))
        .partition(|i| before.invites.iter().any(|old| old.id == i.id));
    for i in existing.into_iter().chain(new) {
        invite::upsert_invite(&mut *conn, i).await?;
    }

    let version =
        court_match::update_match(&mut *conn, &after.court_match, before.court_match.version)
            .await?;
    Ok(version)
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl ClubDirectory for PgStore {
    async fn club(&self, club_id: Uuid) -> CourtResult<Option<ClubMessagingConfig>> {
        Ok(club::get_club_by_id(&self.pool, club_id).await?.map(Into::into))
    }

    async fn club_by_phone(&self, phone_number: &str) -> CourtResult<Option<ClubMessagingConfig>> {
        Ok(club::get_club_by_phone(&self.pool, phone_number)
            .await?
            .map(Into::into))
    }

    async fn player(&self, player_id: Uuid) -> CourtResult<Option<Player>> {
        Ok(player::get_player_by_id(&self.pool, player_id)
            .await?
            .map(Into::into))
    }

    async fn player_by_phone(
        &self,
        club_id: Uuid,
        phone_number: &str,
    ) -> CourtResult<Option<Player>> {
        Ok(player::get_player_by_phone(&self.pool, club_id, phone_number)
            .await?
            .map(Into::into))
    }

    async fn club_players(&self, club_id: Uuid) -> CourtResult<Vec<Player>> {
        Ok(player::get_club_players(&self.pool, club_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}

#[async_trait]
impl MatchStore for PgStore {
    async fn create_match(
        &self,
        club_id: Uuid,
        scheduled_at: DateTime<Utc>,
        originator_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> CourtResult<CourtMatch> {
        let row =
            court_match::create_match(&self.pool, club_id, scheduled_at, originator_id, now)
                .await?;
        Ok(CourtMatch::try_from(row)?)
    }

    async fn get_match(&self, match_id: Uuid) -> CourtResult<Option<CourtMatch>> {
        court_match::get_match_by_id(&self.pool, match_id)
            .await?
            .map(|row| CourtMatch::try_from(row).map_err(CourtError::from))
            .transpose()
    }

    async fn match_by_number(&self, club_id: Uuid, number: i32) -> CourtResult<Option<CourtMatch>> {
        court_match::get_match_by_number(&self.pool, club_id, number)
            .await?
            .map(|row| CourtMatch::try_from(row).map_err(CourtError::from))
            .transpose()
    }

    async fn load_ledger(&self, match_id: Uuid) -> CourtResult<Option<MatchLedger>> {
        // One snapshot for the match row, its invites and its batches.
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        let Some(row) = court_match::get_match_by_id(&mut *tx, match_id).await? else {
            return Ok(None);
        };
        let ledger = read_ledger(&mut *tx, row).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(Some(ledger))
    }

    async fn with_ledger<T, F>(&self, match_id: Uuid, f: F) -> CourtResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut MatchLedger) -> CourtResult<T> + Send + 'static,
    {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let row = court_match::lock_match(&mut *tx, match_id)
            .await?
            .ok_or_else(|| CourtError::NotFound(format!("Match {} not found", match_id)))?;

        let before = read_ledger(&mut *tx, row).await?;
        let mut after = before.clone();

        // Dropping the transaction on any error rolls it back.
        let value = f(&mut after)?;
        after.check_invariants()?;

        if after != before {
            let version = persist_changes(&mut *tx, &before, &after).await?;
            tx.commit().await.map_err(db_error)?;
            tracing::debug!(match_id = %match_id, version, "Ledger committed");
        }
        Ok(value)
    }

    async fn matches_with_status(&self, status: MatchStatus) -> CourtResult<Vec<CourtMatch>> {
        to_matches(court_match::get_matches_with_status(&self.pool, status).await?)
    }

    async fn open_matches(&self, club_id: Uuid) -> CourtResult<Vec<CourtMatch>> {
        to_matches(court_match::get_open_matches(&self.pool, club_id).await?)
    }

    async fn invites_for_player(&self, player_id: Uuid) -> CourtResult<Vec<Invite>> {
        invite::get_player_invites(&self.pool, player_id)
            .await?
            .into_iter()
            .map(|row| Invite::try_from(row).map_err(CourtError::from))
            .collect()
    }

    async fn matches_for_player(&self, player_id: Uuid) -> CourtResult<Vec<CourtMatch>> {
        to_matches(court_match::get_matches_for_player(&self.pool, player_id).await?)
    }

    async fn record_play_request(
        &self,
        club_id: Uuid,
        player_id: Uuid,
        message: &str,
        now: DateTime<Utc>,
    ) -> CourtResult<PlayRequest> {
        let row =
            court_match::create_play_request(&self.pool, club_id, player_id, message, now).await?;
        Ok(row.into())
    }
}

#[async_trait]
impl OutboxStore for PgStore {
    async fn enqueue(&self, message: NewOutboxMessage) -> CourtResult<OutboxMessage> {
        let row = outbox::enqueue(&self.pool, &message).await?;
        Ok(OutboxMessage::try_from(row)?)
    }

    async fn due_messages(&self, now: DateTime<Utc>, max: usize) -> CourtResult<Vec<OutboxMessage>> {
        outbox::get_due_messages(&self.pool, now, limit(max))
            .await?
            .into_iter()
            .map(|row| OutboxMessage::try_from(row).map_err(CourtError::from))
            .collect()
    }

    async fn mark_delivered(&self, id: Uuid, now: DateTime<Utc>) -> CourtResult<()> {
        Ok(outbox::mark_delivered(&self.pool, id, now).await?)
    }

    async fn schedule_retry(
        &self,
        id: Uuid,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> CourtResult<()> {
        Ok(outbox::schedule_retry(&self.pool, id, error, next_attempt_at).await?)
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> CourtResult<()> {
        Ok(outbox::mark_failed(&self.pool, id, error).await?)
    }

    async fn mark_skipped(&self, id: Uuid, reason: &str) -> CourtResult<()> {
        Ok(outbox::mark_skipped(&self.pool, id, reason).await?)
    }

    async fn failed_messages(&self, max: usize) -> CourtResult<Vec<OutboxMessage>> {
        outbox::get_failed_messages(&self.pool, limit(max))
            .await?
            .into_iter()
            .map(|row| OutboxMessage::try_from(row).map_err(CourtError::from))
            .collect()
    }
}

#[async_trait]
impl FeedbackStore for PgStore {
    async fn feedback_responders(&self, match_id: Uuid) -> CourtResult<HashSet<Uuid>> {
        Ok(feedback::get_responders(&self.pool, match_id)
            .await?
            .into_iter()
            .collect())
    }

    async fn record_feedback(&self, entry: FeedbackEntry) -> CourtResult<()> {
        Ok(feedback::record_feedback(&self.pool, &entry).await?)
    }

    async fn feedback_sends(
        &self,
        match_id: Uuid,
        kind: FeedbackKind,
    ) -> CourtResult<Vec<FeedbackSend>> {
        feedback::get_sends(&self.pool, match_id, kind)
            .await?
            .into_iter()
            .map(|row| FeedbackSend::try_from(row).map_err(CourtError::from))
            .collect()
    }

    async fn claim_feedback_send(&self, send: FeedbackSend, force: bool) -> CourtResult<bool> {
        Ok(feedback::claim_send(&self.pool, &send, force).await?)
    }

    async fn release_feedback_send(
        &self,
        match_id: Uuid,
        player_id: Uuid,
        kind: FeedbackKind,
    ) -> CourtResult<()> {
        Ok(feedback::release_send(&self.pool, match_id, player_id, kind).await?)
    }
}

/// Default ranker: strongest players first, then alphabetical.
#[derive(Clone)]
pub struct PgRanker {
    pool: DbPool,
}

impl PgRanker {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateRanker for PgRanker {
    async fn rank_candidates(
        &self,
        club_id: Uuid,
        criteria: &RankCriteria,
        exclude: &[Uuid],
    ) -> CourtResult<Vec<Uuid>> {
        Ok(player::rank_players(&self.pool, club_id, exclude, limit(criteria.limit)).await?)
    }
}
