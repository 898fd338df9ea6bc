//! # Invite ledger
//!
//! [`MatchLedger`] is a snapshot of one match together with every invite and
//! batch recorded against it. All participation changes go through the
//! methods here; they are pure transitions over the snapshot and never touch
//! storage. Stores load a ledger under a per-match lock, apply one transition
//! and persist the result, which is what keeps concurrent replies from
//! overbooking a match.
//!
//! Seats are the source of truth for capacity. A player is counted once they
//! appear in `team1` or `team2`, whether they got there by accepting an invite
//! or by being seated directly (originator, admin assignment).

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CourtError, CourtResult};
use crate::models::court_match::{CourtMatch, MATCH_CAPACITY, MatchStatus, TEAM_CAPACITY, Team};
use crate::models::invite::{Batch, Invite, InviteStatus, batch_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Accept,
    Decline,
    Maybe,
}

/// Result of a player's reply. Capacity conflicts are outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseOutcome {
    Accepted { team: Team, confirmed: bool },
    AlreadyAccepted,
    MatchFull,
    Declined,
    Maybe,
    NoActiveInvite,
    /// The player was removed from this match by an admin.
    NotEligible,
    MatchClosed(MatchStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawOutcome {
    Withdrawn { reopened: bool },
    NotParticipating,
    MatchClosed(MatchStatus),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLedger {
    pub court_match: CourtMatch,
    pub invites: Vec<Invite>,
    pub batches: Vec<Batch>,
}

impl MatchLedger {
    pub fn new(court_match: CourtMatch) -> Self {
        Self {
            court_match,
            invites: Vec::new(),
            batches: Vec::new(),
        }
    }

    pub fn match_id(&self) -> Uuid {
        self.court_match.id
    }

    pub fn status(&self) -> MatchStatus {
        self.court_match.status
    }

    pub fn accepted_count(&self) -> usize {
        self.court_match.seated_count()
    }

    pub fn open_seats(&self) -> usize {
        self.court_match.open_seats()
    }

    pub fn active_invite(&self, player_id: Uuid) -> Option<&Invite> {
        self.invites
            .iter()
            .find(|i| i.player_id == player_id && i.status.is_active())
    }

    fn active_invite_mut(&mut self, player_id: Uuid) -> Option<&mut Invite> {
        self.invites
            .iter_mut()
            .find(|i| i.player_id == player_id && i.status.is_active())
    }

    pub fn invites_for(&self, player_id: Uuid) -> impl Iterator<Item = &Invite> {
        self.invites.iter().filter(move |i| i.player_id == player_id)
    }

    fn was_removed(&self, player_id: Uuid) -> bool {
        self.invites_for(player_id)
            .any(|i| i.status == InviteStatus::Removed)
    }

    /// Everyone already invited, seated, declined or removed. The ranker is
    /// never asked to offer these players again.
    pub fn excluded_players(&self) -> Vec<Uuid> {
        let mut seen = HashSet::new();
        self.court_match
            .seated()
            .copied()
            .chain(self.invites.iter().map(|i| i.player_id))
            .filter(|p| seen.insert(*p))
            .collect()
    }

    pub fn last_batch(&self) -> Option<&Batch> {
        self.batches.iter().max_by_key(|b| b.round)
    }

    pub fn last_round(&self) -> i32 {
        self.last_batch().map(|b| b.round).unwrap_or(0)
    }

    pub fn has_round(&self, round: i32) -> bool {
        let key = batch_key(self.match_id(), round);
        self.batches.iter().any(|b| b.idempotency_key == key)
    }

    /// When the next round may fire. The timeout runs from the last batch's
    /// creation, or from `released_at` if its texts were held until later.
    pub fn next_round_due_at(
        &self,
        timeout: Duration,
        released_at: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        self.last_batch().map(|b| {
            let start = released_at.map_or(b.created_at, |r| r.max(b.created_at));
            start + timeout
        })
    }

    fn ensure_pending(&self) -> CourtResult<()> {
        match self.status() {
            MatchStatus::Pending => Ok(()),
            status => Err(CourtError::MatchClosed {
                match_id: self.match_id(),
                status,
            }),
        }
    }

    /// Opens scheduling round `round`. Returns `None` when the round already
    /// exists, which makes redelivered timer ticks harmless.
    pub fn start_round(&mut self, round: i32, now: DateTime<Utc>) -> CourtResult<Option<Uuid>> {
        self.ensure_pending()?;
        if self.has_round(round) {
            return Ok(None);
        }
        let batch = Batch {
            id: Uuid::new_v4(),
            match_id: self.match_id(),
            round,
            idempotency_key: batch_key(self.match_id(), round),
            invite_ids: Vec::new(),
            excluded_player_ids: self.excluded_players(),
            created_at: now,
        };
        let id = batch.id;
        self.batches.push(batch);
        Ok(Some(id))
    }

    /// Records an invite for `player_id`. `gated` invites wait in the outbox
    /// and start as `pending_sms`.
    pub fn create_invite(
        &mut self,
        player_id: Uuid,
        batch_id: Option<Uuid>,
        gated: bool,
        now: DateTime<Utc>,
    ) -> CourtResult<Invite> {
        self.ensure_pending()?;
        if self.active_invite(player_id).is_some() || self.court_match.is_seated(player_id) {
            return Err(CourtError::DuplicateActiveInvite {
                match_id: self.match_id(),
                player_id,
            });
        }

        let invite = Invite {
            id: Uuid::new_v4(),
            match_id: self.match_id(),
            player_id,
            status: if gated {
                InviteStatus::PendingSms
            } else {
                InviteStatus::Sent
            },
            batch_id,
            sent_at: if gated { None } else { Some(now) },
            responded_at: None,
            created_at: now,
        };

        if let Some(batch_id) = batch_id {
            if let Some(batch) = self.batches.iter_mut().find(|b| b.id == batch_id) {
                batch.invite_ids.push(invite.id);
            }
        }
        self.invites.push(invite.clone());
        Ok(invite)
    }

    /// Applies a player's reply. This is the only way an invite becomes
    /// `accepted`.
    pub fn apply_response(
        &mut self,
        player_id: Uuid,
        response: Response,
        now: DateTime<Utc>,
    ) -> ResponseOutcome {
        match response {
            Response::Accept => self.accept(player_id, now),
            Response::Decline | Response::Maybe => {
                if self.status() != MatchStatus::Pending {
                    return ResponseOutcome::MatchClosed(self.status());
                }
                let Some(invite) = self.active_invite_mut(player_id) else {
                    return ResponseOutcome::NoActiveInvite;
                };
                invite.responded_at = Some(now);
                if response == Response::Decline {
                    invite.status = InviteStatus::Declined;
                    ResponseOutcome::Declined
                } else {
                    invite.status = InviteStatus::Maybe;
                    ResponseOutcome::Maybe
                }
            }
        }
    }

    fn accept(&mut self, player_id: Uuid, now: DateTime<Utc>) -> ResponseOutcome {
        if self.court_match.is_seated(player_id) {
            return ResponseOutcome::AlreadyAccepted;
        }
        let status = self.status();
        if status.is_terminal() {
            return ResponseOutcome::MatchClosed(status);
        }
        if self.open_seats() == 0 {
            return ResponseOutcome::MatchFull;
        }
        if status == MatchStatus::Confirmed {
            return ResponseOutcome::MatchClosed(status);
        }
        if self.was_removed(player_id) {
            return ResponseOutcome::NotEligible;
        }

        let team = self.seat(player_id);
        self.mark_accepted(player_id, now);
        let confirmed = self.confirm_if_full(now);
        ResponseOutcome::Accepted { team, confirmed }
    }

    fn mark_accepted(&mut self, player_id: Uuid, now: DateTime<Utc>) {
        let match_id = self.match_id();
        match self.active_invite_mut(player_id) {
            Some(invite) => {
                invite.status = InviteStatus::Accepted;
                invite.responded_at = Some(now);
                invite.sent_at.get_or_insert(now);
            }
            None => self.invites.push(Invite {
                id: Uuid::new_v4(),
                match_id,
                player_id,
                status: InviteStatus::Accepted,
                batch_id: None,
                sent_at: None,
                responded_at: Some(now),
                created_at: now,
            }),
        }
    }

    // Caller guarantees an open seat.
    fn seat(&mut self, player_id: Uuid) -> Team {
        if self.court_match.team1.len() < TEAM_CAPACITY {
            self.court_match.team1.push(player_id);
            Team::One
        } else {
            self.court_match.team2.push(player_id);
            Team::Two
        }
    }

    fn unseat(&mut self, player_id: Uuid) -> bool {
        let before = self.accepted_count();
        self.court_match.team1.retain(|p| *p != player_id);
        self.court_match.team2.retain(|p| *p != player_id);
        before != self.accepted_count()
    }

    /// Seats an originator or admin-assigned player without an invite round
    /// trip. They count toward capacity exactly like an accepted invite.
    pub fn add_participant(&mut self, player_id: Uuid, now: DateTime<Utc>) -> CourtResult<Team> {
        let status = self.status();
        if status.is_terminal() {
            return Err(CourtError::MatchClosed {
                match_id: self.match_id(),
                status,
            });
        }
        if let Some(team) = self.court_match.team_of(player_id) {
            return Ok(team);
        }
        if self.open_seats() == 0 {
            return Err(CourtError::Validation(format!(
                "match {} is full",
                self.match_id()
            )));
        }

        let team = self.seat(player_id);
        if let Some(invite) = self.active_invite_mut(player_id) {
            invite.status = InviteStatus::Accepted;
            invite.responded_at = Some(now);
        }
        self.confirm_if_full(now);
        Ok(team)
    }

    /// Flips a pending match to confirmed once every seat is taken.
    pub fn confirm_if_full(&mut self, now: DateTime<Utc>) -> bool {
        if self.status() == MatchStatus::Pending && self.open_seats() == 0 {
            self.court_match.status = MatchStatus::Confirmed;
            self.expire_active(now);
            true
        } else {
            false
        }
    }

    /// Manual confirmation, allowed with fewer than four players.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> CourtResult<()> {
        match self.status() {
            MatchStatus::Confirmed => Ok(()),
            MatchStatus::Pending => {
                if self.accepted_count() == 0 {
                    return Err(CourtError::Validation(format!(
                        "match {} has no players to confirm",
                        self.match_id()
                    )));
                }
                self.court_match.status = MatchStatus::Confirmed;
                self.expire_active(now);
                Ok(())
            }
            status => Err(CourtError::MatchClosed {
                match_id: self.match_id(),
                status,
            }),
        }
    }

    /// Cancels the match and returns everyone who should hear about it.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> CourtResult<Vec<Uuid>> {
        match self.status() {
            MatchStatus::Cancelled => Ok(Vec::new()),
            MatchStatus::Completed => Err(CourtError::MatchClosed {
                match_id: self.match_id(),
                status: MatchStatus::Completed,
            }),
            _ => {
                let mut notify: Vec<Uuid> = self.court_match.seated().copied().collect();
                notify.extend(
                    self.invites
                        .iter()
                        .filter(|i| matches!(i.status, InviteStatus::Sent | InviteStatus::Maybe))
                        .map(|i| i.player_id),
                );
                self.court_match.status = MatchStatus::Cancelled;
                self.expire_active(now);
                Ok(notify)
            }
        }
    }

    pub fn complete(&mut self, score: Option<String>) -> CourtResult<()> {
        match self.status() {
            MatchStatus::Confirmed | MatchStatus::Completed => {
                self.court_match.status = MatchStatus::Completed;
                if score.is_some() {
                    self.court_match.score = score;
                }
                Ok(())
            }
            status => Err(CourtError::MatchClosed {
                match_id: self.match_id(),
                status,
            }),
        }
    }

    /// A seated player backs out. A confirmed match drops back to pending so
    /// the scheduler can fill the seat.
    pub fn withdraw(&mut self, player_id: Uuid, now: DateTime<Utc>) -> WithdrawOutcome {
        let status = self.status();
        if status.is_terminal() {
            return WithdrawOutcome::MatchClosed(status);
        }
        if !self.unseat(player_id) {
            return WithdrawOutcome::NotParticipating;
        }
        for invite in self
            .invites
            .iter_mut()
            .filter(|i| i.player_id == player_id && i.status == InviteStatus::Accepted)
        {
            invite.status = InviteStatus::Declined;
            invite.responded_at = Some(now);
        }
        WithdrawOutcome::Withdrawn {
            reopened: self.reopen_if_short(),
        }
    }

    /// Admin removal. Terminalizes every live invite for the player and
    /// frees their seat. Returns whether a confirmed match reopened.
    pub fn remove_player(&mut self, player_id: Uuid, now: DateTime<Utc>) -> CourtResult<bool> {
        let status = self.status();
        if status.is_terminal() {
            return Err(CourtError::MatchClosed {
                match_id: self.match_id(),
                status,
            });
        }

        let unseated = self.unseat(player_id);
        let mut touched = false;
        for invite in self
            .invites
            .iter_mut()
            .filter(|i| i.player_id == player_id && !i.status.is_terminal())
        {
            invite.status = InviteStatus::Removed;
            invite.responded_at.get_or_insert(now);
            touched = true;
        }

        if !unseated && !touched {
            return Err(CourtError::NotFound(format!(
                "player {} has no invite or seat in match {}",
                player_id,
                self.match_id()
            )));
        }
        Ok(self.reopen_if_short())
    }

    fn reopen_if_short(&mut self) -> bool {
        if self.status() == MatchStatus::Confirmed && self.open_seats() > 0 {
            self.court_match.status = MatchStatus::Pending;
            true
        } else {
            false
        }
    }

    /// The outbox delivered a held invite text.
    pub fn mark_dispatched(&mut self, invite_id: Uuid, now: DateTime<Utc>) -> bool {
        match self
            .invites
            .iter_mut()
            .find(|i| i.id == invite_id && i.status == InviteStatus::PendingSms)
        {
            Some(invite) => {
                invite.status = InviteStatus::Sent;
                invite.sent_at = Some(now);
                true
            }
            None => false,
        }
    }

    /// The invite text could not be delivered at all.
    pub fn expire_undeliverable(&mut self, invite_id: Uuid, now: DateTime<Utc>) -> bool {
        match self
            .invites
            .iter_mut()
            .find(|i| i.id == invite_id && i.status.is_active())
        {
            Some(invite) => {
                invite.status = InviteStatus::Expired;
                invite.responded_at = Some(now);
                true
            }
            None => false,
        }
    }

    fn expire_active(&mut self, now: DateTime<Utc>) {
        for invite in self.invites.iter_mut().filter(|i| i.status.is_active()) {
            invite.status = InviteStatus::Expired;
            invite.responded_at = Some(now);
        }
    }

    /// Capacity and uniqueness invariants. Stores assert this before
    /// committing a transition.
    pub fn check_invariants(&self) -> CourtResult<()> {
        let m = &self.court_match;
        if m.team1.len() > TEAM_CAPACITY
            || m.team2.len() > TEAM_CAPACITY
            || m.seated_count() > MATCH_CAPACITY
        {
            return Err(CourtError::Validation(format!(
                "match {} exceeds capacity ({} + {})",
                m.id,
                m.team1.len(),
                m.team2.len()
            )));
        }

        let mut seated = HashSet::new();
        if !m.seated().all(|p| seated.insert(*p)) {
            return Err(CourtError::Validation(format!(
                "match {} seats a player twice",
                m.id
            )));
        }

        let mut active = HashSet::new();
        for invite in self.invites.iter().filter(|i| i.status.is_active()) {
            if !active.insert(invite.player_id) || seated.contains(&invite.player_id) {
                return Err(CourtError::DuplicateActiveInvite {
                    match_id: m.id,
                    player_id: invite.player_id,
                });
            }
        }
        Ok(())
    }
}
