use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seats in a doubles match.
pub const MATCH_CAPACITY: usize = 4;
/// Seats on one side of the net.
pub const TEAM_CAPACITY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Confirmed => "confirmed",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Cancelled)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "confirmed" => Ok(MatchStatus::Confirmed),
            "completed" => Ok(MatchStatus::Completed),
            "cancelled" => Ok(MatchStatus::Cancelled),
            other => Err(format!("unknown match status {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    One,
    Two,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourtMatch {
    pub id: Uuid,
    pub club_id: Uuid,
    /// Club-scoped number players text to join ("JOIN" is just the digits).
    pub number: i32,
    pub scheduled_at: DateTime<Utc>,
    pub status: MatchStatus,
    pub team1: Vec<Uuid>,
    pub team2: Vec<Uuid>,
    pub originator_id: Option<Uuid>,
    pub score: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl CourtMatch {
    pub fn seated(&self) -> impl Iterator<Item = &Uuid> {
        self.team1.iter().chain(self.team2.iter())
    }

    pub fn seated_count(&self) -> usize {
        self.team1.len() + self.team2.len()
    }

    pub fn open_seats(&self) -> usize {
        MATCH_CAPACITY.saturating_sub(self.seated_count())
    }

    pub fn is_seated(&self, player_id: Uuid) -> bool {
        self.seated().any(|p| *p == player_id)
    }

    pub fn team_of(&self, player_id: Uuid) -> Option<Team> {
        if self.team1.contains(&player_id) {
            Some(Team::One)
        } else if self.team2.contains(&player_id) {
            Some(Team::Two)
        } else {
            None
        }
    }
}

/// A request to organise a match, as submitted by the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMatchRequest {
    pub club_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub originator_id: Option<Uuid>,
    /// Players the admin seats directly, bypassing the invite flow.
    #[serde(default)]
    pub player_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignPlayerRequest {
    pub player_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteMatchRequest {
    pub score: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayRequest {
    pub id: Uuid,
    pub club_id: Uuid,
    pub player_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
