use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Request,
    Reminder,
    Resend,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Request => "request",
            FeedbackKind::Reminder => "reminder",
            FeedbackKind::Resend => "resend",
        }
    }
}

impl FromStr for FeedbackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(FeedbackKind::Request),
            "reminder" => Ok(FeedbackKind::Reminder),
            "resend" => Ok(FeedbackKind::Resend),
            other => Err(format!("unknown feedback kind {:?}", other)),
        }
    }
}

/// One player's rating of another after a completed match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub match_id: Uuid,
    pub from_player_id: Uuid,
    pub rated_player_id: Uuid,
    pub score: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSend {
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub kind: FeedbackKind,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResendFeedbackRequest {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendFeedbackResponse {
    pub match_id: Uuid,
    pub messaged_player_ids: Vec<Uuid>,
}
