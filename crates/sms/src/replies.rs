//! Outbound text templates.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use courtcall_core::ledger::{ResponseOutcome, WithdrawOutcome};
use courtcall_core::models::court_match::{CourtMatch, MatchStatus, Team};

pub const HELP: &str = "Text a match number to join (e.g. 12, or 12 14 for several). \
YES / NO / MAYBE answers your latest invite. CANCEL 12 drops you from match 12. \
STATUS, MATCHES and NEXT show your games. RATE <name> <1-5> rates a partner. \
PLAY <when> asks the club for a game.";

pub fn format_when(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%a %-d %b %H:%M").to_string()
}

pub fn unknown_sender(club_name: &str) -> String {
    format!(
        "{}: we don't recognise this number. Ask the club to add you as a player.",
        club_name
    )
}

pub fn invite(club_name: &str, number: i32, when: &str, open_seats: usize) -> String {
    format!(
        "{}: doubles match #{} on {} ({} spot{} left). Reply YES to play, NO to pass or MAYBE.",
        club_name,
        number,
        when,
        open_seats,
        if open_seats == 1 { "" } else { "s" }
    )
}

fn team_name(team: Team) -> &'static str {
    match team {
        Team::One => "team 1",
        Team::Two => "team 2",
    }
}

fn status_phrase(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::Pending => "still open",
        MatchStatus::Confirmed => "already confirmed",
        MatchStatus::Completed => "already played",
        MatchStatus::Cancelled => "cancelled",
    }
}

pub fn response_line(number: i32, outcome: &ResponseOutcome) -> String {
    match outcome {
        ResponseOutcome::Accepted { team, confirmed: true } => format!(
            "You're in match #{} on {}. That's four, the match is confirmed!",
            number,
            team_name(*team)
        ),
        ResponseOutcome::Accepted { team, confirmed: false } => {
            format!("You're in match #{} on {}.", number, team_name(*team))
        }
        ResponseOutcome::AlreadyAccepted => format!("You're already in match #{}.", number),
        ResponseOutcome::MatchFull => format!("Sorry, match #{} is full.", number),
        ResponseOutcome::Declined => format!("No problem, you've passed on match #{}.", number),
        ResponseOutcome::Maybe => format!(
            "Noted, we'll keep match #{} open for you. Reply YES when you know.",
            number
        ),
        ResponseOutcome::NoActiveInvite => {
            format!("You don't have an open invite for match #{}.", number)
        }
        ResponseOutcome::NotEligible => {
            format!("You can't join match #{}. Please contact the club.", number)
        }
        ResponseOutcome::MatchClosed(status) => {
            format!("Match #{} is {}.", number, status_phrase(*status))
        }
    }
}

pub fn withdraw_line(number: i32, outcome: &WithdrawOutcome) -> String {
    match outcome {
        WithdrawOutcome::Withdrawn { .. } => {
            format!("You've been taken off match #{}. Thanks for letting us know.", number)
        }
        WithdrawOutcome::NotParticipating => format!("You're not playing in match #{}.", number),
        WithdrawOutcome::MatchClosed(status) => {
            format!("Match #{} is {}.", number, status_phrase(*status))
        }
    }
}

pub fn match_not_found(number: i32) -> String {
    format!("There's no match #{}.", number)
}

pub fn no_open_invite() -> String {
    "You don't have an open invite right now. Text MATCHES to see open games.".to_string()
}

pub fn confirmed_notice(number: i32, when: &str) -> String {
    format!("Match #{} on {} is confirmed. See you on court!", number, when)
}

pub fn cancelled_notice(number: i32, when: &str) -> String {
    format!("Match #{} on {} has been cancelled.", number, when)
}

pub fn feedback_request(number: i32, names: &[String]) -> String {
    format!(
        "How was match #{}? Rate your fellow players: reply RATE <name> <1-5>, e.g. RATE {} 4.",
        number,
        names.first().map(String::as_str).unwrap_or("Alex")
    )
}

pub fn feedback_reminder(number: i32) -> String {
    format!(
        "Reminder: we'd love your ratings for match #{}. Reply RATE <name> <1-5>.",
        number
    )
}

pub fn rating_recorded(name: &str, score: u8) -> String {
    format!("Thanks! Recorded {} for {}.", score, name)
}

pub fn rating_no_match() -> String {
    "We couldn't find a finished match to rate.".to_string()
}

pub fn rating_unknown_player(name: &str) -> String {
    format!("Nobody called {} played in your last match.", name)
}

pub fn play_request_received() -> String {
    "Thanks, we've passed your request on to the club.".to_string()
}

pub fn match_line(court_match: &CourtMatch, tz: Tz) -> String {
    format!(
        "#{} {} ({}/4, {})",
        court_match.number,
        format_when(court_match.scheduled_at, tz),
        court_match.seated_count(),
        court_match.status
    )
}

pub fn open_matches(lines: &[String]) -> String {
    if lines.is_empty() {
        "No open matches right now.".to_string()
    } else {
        format!("Open matches: {}. Text the number to join.", lines.join("; "))
    }
}

pub fn status(playing: &[String], invited: &[String]) -> String {
    if playing.is_empty() && invited.is_empty() {
        return "You have no upcoming matches or open invites.".to_string();
    }
    let mut parts = Vec::new();
    if !playing.is_empty() {
        parts.push(format!("Playing: {}", playing.join("; ")));
    }
    if !invited.is_empty() {
        parts.push(format!("Invited: {}", invited.join("; ")));
    }
    parts.join(". ")
}

pub fn next_match(line: Option<&String>) -> String {
    match line {
        Some(line) => format!("Your next match: {}", line),
        None => "You have no upcoming matches.".to_string(),
    }
}
