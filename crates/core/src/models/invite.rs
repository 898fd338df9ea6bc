use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    /// Created during quiet hours; the text is still waiting in the outbox.
    PendingSms,
    Sent,
    Maybe,
    Accepted,
    Declined,
    Expired,
    Removed,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::PendingSms => "pending_sms",
            InviteStatus::Sent => "sent",
            InviteStatus::Maybe => "maybe",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Declined => "declined",
            InviteStatus::Expired => "expired",
            InviteStatus::Removed => "removed",
        }
    }

    /// Still waiting on the player.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            InviteStatus::Sent | InviteStatus::Maybe | InviteStatus::PendingSms
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InviteStatus::Declined | InviteStatus::Expired | InviteStatus::Removed
        )
    }
}

impl fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InviteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_sms" => Ok(InviteStatus::PendingSms),
            "sent" => Ok(InviteStatus::Sent),
            "maybe" => Ok(InviteStatus::Maybe),
            "accepted" => Ok(InviteStatus::Accepted),
            "declined" => Ok(InviteStatus::Declined),
            "expired" => Ok(InviteStatus::Expired),
            "removed" => Ok(InviteStatus::Removed),
            other => Err(format!("unknown invite status {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invite {
    pub id: Uuid,
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub status: InviteStatus,
    /// `None` for walk-in joins that never went through a batch.
    pub batch_id: Option<Uuid>,
    pub sent_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub match_id: Uuid,
    pub round: i32,
    pub idempotency_key: String,
    pub invite_ids: Vec<Uuid>,
    pub excluded_player_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

pub fn batch_key(match_id: Uuid, round: i32) -> String {
    format!("{}:{}", match_id, round)
}
