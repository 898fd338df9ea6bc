//! Inbound message routing.
//!
//! Resolves the club from the number that was texted and the player from the
//! sender, parses the body and applies the command. Every reply and notice
//! produced is queued through the dispatcher and also returned to the caller.

use std::sync::Arc;

use courtcall_core::clock::Clock;
use courtcall_core::command::{self, Command};
use courtcall_core::errors::{CourtError, CourtResult};
use courtcall_core::ledger::{Response, ResponseOutcome, WithdrawOutcome};
use courtcall_core::models::club::{ClubMessagingConfig, Player};
use courtcall_core::models::court_match::{CourtMatch, MatchStatus};
use courtcall_core::models::feedback::FeedbackEntry;
use courtcall_core::models::outbox::OutboundSms;
use courtcall_core::store::{CandidateRanker, Store};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatch::Dispatcher;
use crate::replies;
use crate::scheduler::BatchScheduler;

/// Builds one proactive notice per player, skipping `except`.
pub(crate) async fn notify_players<S: Store>(
    store: &S,
    court_match: &CourtMatch,
    player_ids: &[Uuid],
    body: &str,
    except: Option<Uuid>,
) -> CourtResult<Vec<OutboundSms>> {
    let mut messages = Vec::new();
    for player_id in player_ids.iter().filter(|p| Some(**p) != except) {
        match store.player(*player_id).await? {
            Some(player) => messages.push(
                OutboundSms::notice(player.phone_number, body).for_match(court_match.id),
            ),
            None => warn!(player_id = %player_id, "Cannot notify player without directory entry"),
        }
    }
    Ok(messages)
}

pub struct Router<S, R> {
    store: Arc<S>,
    dispatcher: Dispatcher<S>,
    scheduler: BatchScheduler<S, R>,
    clock: Arc<dyn Clock>,
}

impl<S, R> Clone for Router<S, R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            dispatcher: self.dispatcher.clone(),
            scheduler: self.scheduler.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S: Store, R: CandidateRanker> Router<S, R> {
    pub fn new(
        store: Arc<S>,
        dispatcher: Dispatcher<S>,
        scheduler: BatchScheduler<S, R>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            scheduler,
            clock,
        }
    }

    /// Handles one inbound text. Unknown club numbers produce no replies.
    pub async fn receive_sms(&self, from: &str, to: &str, body: &str) -> CourtResult<Vec<OutboundSms>> {
        let Some(club) = self.store.club_by_phone(to).await? else {
            warn!(to = %to, "Inbound SMS for a number no club owns");
            return Ok(Vec::new());
        };

        let command = command::parse(body);
        info!(club_id = %club.club_id, from = %from, command = command.name(), "Inbound SMS");

        let messages = match self.store.player_by_phone(club.club_id, from).await? {
            Some(player) => self.route(&club, &player, command).await?,
            None => vec![OutboundSms::reply(from, replies::unknown_sender(&club.name))],
        };

        self.dispatcher.send_all(&club, messages.clone()).await?;
        Ok(messages)
    }

    async fn route(
        &self,
        club: &ClubMessagingConfig,
        player: &Player,
        command: Command,
    ) -> CourtResult<Vec<OutboundSms>> {
        let mut notices = Vec::new();
        let reply = match command {
            Command::Join(numbers) => {
                let mut lines = Vec::with_capacity(numbers.len());
                for number in numbers {
                    lines.push(self.join(club, player, number, &mut notices).await);
                }
                lines.join(" ")
            }
            Command::Yes => self.answer_latest(club, player, Response::Accept, &mut notices).await?,
            Command::No => self.answer_latest(club, player, Response::Decline, &mut notices).await?,
            Command::Maybe => self.answer_latest(club, player, Response::Maybe, &mut notices).await?,
            Command::Cancel(number) => self.withdraw(club, player, number).await?,
            Command::Rate { player: name, score } => self.rate(player, &name, score).await?,
            Command::Play(text) => {
                self.store
                    .record_play_request(club.club_id, player.id, &text, self.clock.now())
                    .await?;
                replies::play_request_received()
            }
            Command::Status => self.status(club, player).await?,
            Command::ListMatches => {
                let tz = club.tz()?;
                let lines: Vec<String> = self
                    .store
                    .open_matches(club.club_id)
                    .await?
                    .iter()
                    .map(|m| replies::match_line(m, tz))
                    .collect();
                replies::open_matches(&lines)
            }
            Command::Next => self.next(club, player).await?,
            Command::Help | Command::Unknown => replies::HELP.to_string(),
        };

        let mut messages = vec![OutboundSms::reply(player.phone_number.clone(), reply)];
        messages.extend(notices);
        Ok(messages)
    }

    // Each number is applied on its own; one failure never blocks the rest.
    async fn join(
        &self,
        club: &ClubMessagingConfig,
        player: &Player,
        number: i32,
        notices: &mut Vec<OutboundSms>,
    ) -> String {
        let court_match = match self.store.match_by_number(club.club_id, number).await {
            Ok(Some(m)) => m,
            Ok(None) => return replies::match_not_found(number),
            Err(e) => {
                warn!(number, error = %e, "Match lookup failed");
                return format!("Couldn't update match #{}, please try again.", number);
            }
        };

        match self.respond(club, player, &court_match, Response::Accept, notices).await {
            Ok(line) => line,
            Err(e) => {
                warn!(match_id = %court_match.id, error = %e, "Join failed");
                format!("Couldn't update match #{}, please try again.", number)
            }
        }
    }

    async fn respond(
        &self,
        club: &ClubMessagingConfig,
        player: &Player,
        court_match: &CourtMatch,
        response: Response,
        notices: &mut Vec<OutboundSms>,
    ) -> CourtResult<String> {
        let player_id = player.id;
        let now = self.clock.now();
        let (outcome, seated) = self
            .store
            .with_ledger(court_match.id, move |ledger| {
                let outcome = ledger.apply_response(player_id, response, now);
                Ok((outcome, ledger.court_match.seated().copied().collect::<Vec<_>>()))
            })
            .await?;
        debug!(match_id = %court_match.id, player_id = %player_id, ?outcome, "Response applied");

        if let ResponseOutcome::Accepted { confirmed: true, .. } = outcome {
            info!(match_id = %court_match.id, "Match confirmed");
            self.scheduler.disarm(court_match.id);
            let when = replies::format_when(court_match.scheduled_at, club.tz()?);
            let body = replies::confirmed_notice(court_match.number, &when);
            notices.extend(
                notify_players(&*self.store, court_match, &seated, &body, Some(player_id)).await?,
            );
        }
        Ok(replies::response_line(court_match.number, &outcome))
    }

    /// YES / NO / MAYBE apply to the player's most recent open invite.
    async fn answer_latest(
        &self,
        club: &ClubMessagingConfig,
        player: &Player,
        response: Response,
        notices: &mut Vec<OutboundSms>,
    ) -> CourtResult<String> {
        let latest = self
            .store
            .invites_for_player(player.id)
            .await?
            .into_iter()
            .filter(|i| i.status.is_active())
            .max_by_key(|i| i.created_at);
        let Some(invite) = latest else {
            return Ok(replies::no_open_invite());
        };
        let court_match = self
            .store
            .get_match(invite.match_id)
            .await?
            .ok_or_else(|| CourtError::NotFound(format!("Match {} not found", invite.match_id)))?;

        self.respond(club, player, &court_match, response, notices).await
    }

    async fn withdraw(
        &self,
        club: &ClubMessagingConfig,
        player: &Player,
        number: i32,
    ) -> CourtResult<String> {
        let Some(court_match) = self.store.match_by_number(club.club_id, number).await? else {
            return Ok(replies::match_not_found(number));
        };
        let player_id = player.id;
        let now = self.clock.now();
        let outcome = self
            .store
            .with_ledger(court_match.id, move |ledger| Ok(ledger.withdraw(player_id, now)))
            .await?;

        if let WithdrawOutcome::Withdrawn { reopened } = outcome {
            info!(match_id = %court_match.id, player_id = %player_id, reopened, "Player withdrew");
            if court_match.status == MatchStatus::Pending || reopened {
                self.scheduler.arm(court_match.id);
            }
        }
        Ok(replies::withdraw_line(number, &outcome))
    }

    async fn rate(&self, player: &Player, name: &str, score: u8) -> CourtResult<String> {
        let last_played = self
            .store
            .matches_for_player(player.id)
            .await?
            .into_iter()
            .filter(|m| m.status == MatchStatus::Completed)
            .max_by_key(|m| m.scheduled_at);
        let Some(court_match) = last_played else {
            return Ok(replies::rating_no_match());
        };

        let mut rated = None;
        for id in court_match.seated().filter(|id| **id != player.id) {
            if let Some(other) = self.store.player(*id).await? {
                if other.answers_to(name) {
                    rated = Some(other);
                    break;
                }
            }
        }
        let Some(rated) = rated else {
            return Ok(replies::rating_unknown_player(name));
        };

        self.store
            .record_feedback(FeedbackEntry {
                match_id: court_match.id,
                from_player_id: player.id,
                rated_player_id: rated.id,
                score,
                created_at: self.clock.now(),
            })
            .await?;
        Ok(replies::rating_recorded(&rated.name, score))
    }

    async fn status(&self, club: &ClubMessagingConfig, player: &Player) -> CourtResult<String> {
        let tz = club.tz()?;
        let playing: Vec<String> = self
            .store
            .matches_for_player(player.id)
            .await?
            .iter()
            .filter(|m| !m.status.is_terminal())
            .map(|m| replies::match_line(m, tz))
            .collect();

        let mut invited = Vec::new();
        for invite in self.store.invites_for_player(player.id).await? {
            if !invite.status.is_active() {
                continue;
            }
            if let Some(m) = self.store.get_match(invite.match_id).await? {
                invited.push(replies::match_line(&m, tz));
            }
        }
        Ok(replies::status(&playing, &invited))
    }

    async fn next(&self, club: &ClubMessagingConfig, player: &Player) -> CourtResult<String> {
        let now = self.clock.now();
        let tz = club.tz()?;
        let upcoming = self
            .store
            .matches_for_player(player.id)
            .await?
            .into_iter()
            .filter(|m| !m.status.is_terminal() && m.scheduled_at >= now)
            .min_by_key(|m| m.scheduled_at)
            .map(|m| replies::match_line(&m, tz));
        Ok(replies::next_match(upcoming.as_ref()))
    }
}
