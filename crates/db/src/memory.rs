//! In-memory store with the same semantics as [`crate::PgStore`].
//!
//! Each match ledger sits behind its own async mutex, the in-process analogue
//! of the Postgres row lock. Transitions run on a copy of the ledger and are
//! committed only if they succeed and the invariants still hold. Used by the
//! test suites and for running the API without a database.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courtcall_core::errors::{CourtError, CourtResult};
use courtcall_core::ledger::MatchLedger;
use courtcall_core::models::club::{ClubMessagingConfig, Player};
use courtcall_core::models::court_match::{CourtMatch, MatchStatus, PlayRequest};
use courtcall_core::models::feedback::{FeedbackEntry, FeedbackKind, FeedbackSend};
use courtcall_core::models::invite::Invite;
use courtcall_core::models::outbox::{DeliveryStatus, NewOutboxMessage, OutboxMessage};
use courtcall_core::store::{
    CandidateRanker, ClubDirectory, FeedbackStore, MatchStore, OutboxStore, RankCriteria,
};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

type LedgerSlot = Arc<Mutex<MatchLedger>>;

#[derive(Default)]
struct Directory {
    clubs: HashMap<Uuid, ClubMessagingConfig>,
    players: HashMap<Uuid, Player>,
}

#[derive(Default)]
struct Outbox {
    next_seq: i64,
    messages: Vec<OutboxMessage>,
}

#[derive(Default)]
struct Feedback {
    entries: Vec<FeedbackEntry>,
    sends: HashMap<(Uuid, Uuid, FeedbackKind), FeedbackSend>,
}

#[derive(Default)]
pub struct MemoryStore {
    directory: RwLock<Directory>,
    ledgers: RwLock<HashMap<Uuid, LedgerSlot>>,
    // Serializes match numbering per club
    numbering: Mutex<HashMap<Uuid, i32>>,
    outbox: Mutex<Outbox>,
    feedback: Mutex<Feedback>,
    play_requests: Mutex<Vec<PlayRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_club(&self, club: ClubMessagingConfig) {
        self.directory.write().await.clubs.insert(club.club_id, club);
    }

    pub async fn insert_player(
        &self,
        club_id: Uuid,
        name: &str,
        phone_number: &str,
        level: Option<f64>,
    ) -> Player {
        let player = Player {
            id: Uuid::new_v4(),
            club_id,
            name: name.to_string(),
            phone_number: phone_number.to_string(),
            level,
            created_at: Utc::now(),
        };
        self.directory
            .write()
            .await
            .players
            .insert(player.id, player.clone());
        player
    }

    /// Every outbox entry in sequence order, whatever its status.
    pub async fn outbox_messages(&self) -> Vec<OutboxMessage> {
        self.outbox.lock().await.messages.clone()
    }

    pub async fn play_requests(&self) -> Vec<PlayRequest> {
        self.play_requests.lock().await.clone()
    }

    pub async fn feedback_entries(&self, match_id: Uuid) -> Vec<FeedbackEntry> {
        self.feedback
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| e.match_id == match_id)
            .cloned()
            .collect()
    }

    async fn slot(&self, match_id: Uuid) -> Option<LedgerSlot> {
        self.ledgers.read().await.get(&match_id).cloned()
    }

    async fn all_slots(&self) -> Vec<LedgerSlot> {
        self.ledgers.read().await.values().cloned().collect()
    }

    async fn find_matches<P>(&self, predicate: P) -> Vec<CourtMatch>
    where
        P: Fn(&MatchLedger) -> bool,
    {
        let mut found = Vec::new();
        for slot in self.all_slots().await {
            let ledger = slot.lock().await;
            if predicate(&ledger) {
                found.push(ledger.court_match.clone());
            }
        }
        found.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then(a.number.cmp(&b.number))
        });
        found
    }

    fn update_message<F>(outbox: &mut Outbox, id: Uuid, update: F) -> CourtResult<()>
    where
        F: FnOnce(&mut OutboxMessage),
    {
        let message = outbox
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| CourtError::NotFound(format!("Outbox message {} not found", id)))?;
        update(message);
        Ok(())
    }
}

#[async_trait]
impl ClubDirectory for MemoryStore {
    async fn club(&self, club_id: Uuid) -> CourtResult<Option<ClubMessagingConfig>> {
        Ok(self.directory.read().await.clubs.get(&club_id).cloned())
    }

    async fn club_by_phone(&self, phone_number: &str) -> CourtResult<Option<ClubMessagingConfig>> {
        Ok(self
            .directory
            .read()
            .await
            .clubs
            .values()
            .find(|c| c.phone_number.as_deref() == Some(phone_number))
            .cloned())
    }

    async fn player(&self, player_id: Uuid) -> CourtResult<Option<Player>> {
        Ok(self.directory.read().await.players.get(&player_id).cloned())
    }

    async fn player_by_phone(
        &self,
        club_id: Uuid,
        phone_number: &str,
    ) -> CourtResult<Option<Player>> {
        Ok(self
            .directory
            .read()
            .await
            .players
            .values()
            .find(|p| p.club_id == club_id && p.phone_number == phone_number)
            .cloned())
    }

    async fn club_players(&self, club_id: Uuid) -> CourtResult<Vec<Player>> {
        let mut players: Vec<Player> = self
            .directory
            .read()
            .await
            .players
            .values()
            .filter(|p| p.club_id == club_id)
            .cloned()
            .collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(players)
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn create_match(
        &self,
        club_id: Uuid,
        scheduled_at: DateTime<Utc>,
        originator_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> CourtResult<CourtMatch> {
        let mut numbering = self.numbering.lock().await;
        let number = numbering.entry(club_id).or_insert(0);
        *number += 1;

        let court_match = CourtMatch {
            id: Uuid::new_v4(),
            club_id,
            number: *number,
            scheduled_at,
            status: MatchStatus::Pending,
            team1: Vec::new(),
            team2: Vec::new(),
            originator_id,
            score: None,
            version: 0,
            created_at: now,
        };
        self.ledgers.write().await.insert(
            court_match.id,
            Arc::new(Mutex::new(MatchLedger::new(court_match.clone()))),
        );
        Ok(court_match)
    }

    async fn get_match(&self, match_id: Uuid) -> CourtResult<Option<CourtMatch>> {
        match self.slot(match_id).await {
            Some(slot) => Ok(Some(slot.lock().await.court_match.clone())),
            None => Ok(None),
        }
    }

    async fn match_by_number(&self, club_id: Uuid, number: i32) -> CourtResult<Option<CourtMatch>> {
        Ok(self
            .find_matches(|l| l.court_match.club_id == club_id && l.court_match.number == number)
            .await
            .into_iter()
            .next())
    }

    async fn load_ledger(&self, match_id: Uuid) -> CourtResult<Option<MatchLedger>> {
        match self.slot(match_id).await {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn with_ledger<T, F>(&self, match_id: Uuid, f: F) -> CourtResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut MatchLedger) -> CourtResult<T> + Send + 'static,
    {
        let slot = self
            .slot(match_id)
            .await
            .ok_or_else(|| CourtError::NotFound(format!("Match {} not found", match_id)))?;
        let mut current = slot.lock().await;

        let mut draft = current.clone();
        let value = f(&mut draft)?;
        draft.check_invariants()?;

        if draft != *current {
            draft.court_match.version += 1;
            *current = draft;
        }
        Ok(value)
    }

    async fn matches_with_status(&self, status: MatchStatus) -> CourtResult<Vec<CourtMatch>> {
        Ok(self.find_matches(|l| l.status() == status).await)
    }

    async fn open_matches(&self, club_id: Uuid) -> CourtResult<Vec<CourtMatch>> {
        Ok(self
            .find_matches(|l| {
                l.court_match.club_id == club_id && l.status() == MatchStatus::Pending
            })
            .await)
    }

    async fn invites_for_player(&self, player_id: Uuid) -> CourtResult<Vec<Invite>> {
        let mut invites = Vec::new();
        for slot in self.all_slots().await {
            let ledger = slot.lock().await;
            invites.extend(ledger.invites_for(player_id).cloned());
        }
        invites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invites)
    }

    async fn matches_for_player(&self, player_id: Uuid) -> CourtResult<Vec<CourtMatch>> {
        Ok(self
            .find_matches(|l| l.court_match.is_seated(player_id))
            .await)
    }

    async fn record_play_request(
        &self,
        club_id: Uuid,
        player_id: Uuid,
        message: &str,
        now: DateTime<Utc>,
    ) -> CourtResult<PlayRequest> {
        let request = PlayRequest {
            id: Uuid::new_v4(),
            club_id,
            player_id,
            message: message.to_string(),
            created_at: now,
        };
        self.play_requests.lock().await.push(request.clone());
        Ok(request)
    }
}

#[async_trait]
impl OutboxStore for MemoryStore {
    async fn enqueue(&self, message: NewOutboxMessage) -> CourtResult<OutboxMessage> {
        let mut outbox = self.outbox.lock().await;
        outbox.next_seq += 1;
        let row = OutboxMessage {
            id: Uuid::new_v4(),
            seq: outbox.next_seq,
            club_id: message.club_id,
            from_number: message.from_number,
            to_number: message.sms.to_number,
            body: message.sms.body,
            kind: message.sms.kind,
            match_id: message.sms.match_id,
            invite_id: message.sms.invite_id,
            created_at: message.created_at,
            send_after: message.send_after,
            attempts: 0,
            last_error: None,
            status: DeliveryStatus::Queued,
            delivered_at: None,
        };
        outbox.messages.push(row.clone());
        Ok(row)
    }

    async fn due_messages(&self, now: DateTime<Utc>, limit: usize) -> CourtResult<Vec<OutboxMessage>> {
        let outbox = self.outbox.lock().await;
        let queued: Vec<&OutboxMessage> = outbox
            .messages
            .iter()
            .filter(|m| m.status == DeliveryStatus::Queued)
            .collect();

        let mut due: Vec<OutboxMessage> = queued
            .iter()
            .filter(|m| m.send_after <= now)
            .filter(|m| {
                !queued.iter().any(|e| {
                    e.to_number == m.to_number
                        && e.seq < m.seq
                        && (e.attempts > 0 || e.send_after <= m.send_after)
                })
            })
            .map(|m| (*m).clone())
            .collect();
        due.sort_by(|a, b| a.send_after.cmp(&b.send_after).then(a.seq.cmp(&b.seq)));
        due.truncate(limit);
        Ok(due)
    }

    async fn mark_delivered(&self, id: Uuid, now: DateTime<Utc>) -> CourtResult<()> {
        let mut outbox = self.outbox.lock().await;
        Self::update_message(&mut outbox, id, |m| {
            m.status = DeliveryStatus::Delivered;
            m.attempts += 1;
            m.last_error = None;
            m.delivered_at = Some(now);
        })
    }

    async fn schedule_retry(
        &self,
        id: Uuid,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> CourtResult<()> {
        let mut outbox = self.outbox.lock().await;
        Self::update_message(&mut outbox, id, |m| {
            m.attempts += 1;
            m.last_error = Some(error.to_string());
            m.send_after = next_attempt_at;
        })
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> CourtResult<()> {
        let mut outbox = self.outbox.lock().await;
        Self::update_message(&mut outbox, id, |m| {
            m.status = DeliveryStatus::Failed;
            m.attempts += 1;
            m.last_error = Some(error.to_string());
        })
    }

    async fn mark_skipped(&self, id: Uuid, reason: &str) -> CourtResult<()> {
        let mut outbox = self.outbox.lock().await;
        Self::update_message(&mut outbox, id, |m| {
            m.status = DeliveryStatus::Skipped;
            m.last_error = Some(reason.to_string());
        })
    }

    async fn failed_messages(&self, limit: usize) -> CourtResult<Vec<OutboxMessage>> {
        let outbox = self.outbox.lock().await;
        Ok(outbox
            .messages
            .iter()
            .rev()
            .filter(|m| m.status == DeliveryStatus::Failed)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn feedback_responders(&self, match_id: Uuid) -> CourtResult<HashSet<Uuid>> {
        Ok(self
            .feedback
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| e.match_id == match_id)
            .map(|e| e.from_player_id)
            .collect())
    }

    async fn record_feedback(&self, entry: FeedbackEntry) -> CourtResult<()> {
        let mut feedback = self.feedback.lock().await;
        feedback.entries.retain(|e| {
            !(e.match_id == entry.match_id
                && e.from_player_id == entry.from_player_id
                && e.rated_player_id == entry.rated_player_id)
        });
        feedback.entries.push(entry);
        Ok(())
    }

    async fn feedback_sends(
        &self,
        match_id: Uuid,
        kind: FeedbackKind,
    ) -> CourtResult<Vec<FeedbackSend>> {
        let mut sends: Vec<FeedbackSend> = self
            .feedback
            .lock()
            .await
            .sends
            .values()
            .filter(|s| s.match_id == match_id && s.kind == kind)
            .cloned()
            .collect();
        sends.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
        Ok(sends)
    }

    async fn claim_feedback_send(&self, send: FeedbackSend, force: bool) -> CourtResult<bool> {
        let mut feedback = self.feedback.lock().await;
        let key = (send.match_id, send.player_id, send.kind);
        if feedback.sends.contains_key(&key) && !force {
            return Ok(false);
        }
        feedback.sends.insert(key, send);
        Ok(true)
    }

    async fn release_feedback_send(
        &self,
        match_id: Uuid,
        player_id: Uuid,
        kind: FeedbackKind,
    ) -> CourtResult<()> {
        self.feedback.lock().await.sends.remove(&(match_id, player_id, kind));
        Ok(())
    }
}

#[async_trait]
impl CandidateRanker for MemoryStore {
    async fn rank_candidates(
        &self,
        club_id: Uuid,
        criteria: &RankCriteria,
        exclude: &[Uuid],
    ) -> CourtResult<Vec<Uuid>> {
        let mut players = self.club_players(club_id).await?;
        players.retain(|p| !exclude.contains(&p.id));
        players.sort_by(|a, b| {
            b.level
                .partial_cmp(&a.level)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(players
            .into_iter()
            .take(criteria.limit)
            .map(|p| p.id)
            .collect())
    }
}
