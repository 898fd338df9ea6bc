use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a text answers something the player just sent, or was initiated by
/// the engine. Only proactive texts respect quiet hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Reactive,
    Proactive,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Reactive => "reactive",
            MessageKind::Proactive => "proactive",
        }
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reactive" => Ok(MessageKind::Reactive),
            "proactive" => Ok(MessageKind::Proactive),
            other => Err(format!("unknown message kind {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Queued,
    Delivered,
    Failed,
    /// Dropped before sending because it no longer applies (e.g. the invite
    /// it carried expired while held for quiet hours).
    Skipped,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Queued => "queued",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(DeliveryStatus::Queued),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "failed" => Ok(DeliveryStatus::Failed),
            "skipped" => Ok(DeliveryStatus::Skipped),
            other => Err(format!("unknown delivery status {:?}", other)),
        }
    }
}

/// A text produced by the engine before it is queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundSms {
    pub to_number: String,
    pub body: String,
    pub kind: MessageKind,
    pub match_id: Option<Uuid>,
    pub invite_id: Option<Uuid>,
}

impl OutboundSms {
    pub fn reply(to_number: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to_number: to_number.into(),
            body: body.into(),
            kind: MessageKind::Reactive,
            match_id: None,
            invite_id: None,
        }
    }

    pub fn notice(to_number: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Proactive,
            ..Self::reply(to_number, body)
        }
    }

    pub fn for_match(mut self, match_id: Uuid) -> Self {
        self.match_id = Some(match_id);
        self
    }

    pub fn for_invite(mut self, match_id: Uuid, invite_id: Uuid) -> Self {
        self.match_id = Some(match_id);
        self.invite_id = Some(invite_id);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOutboxMessage {
    pub club_id: Uuid,
    pub from_number: String,
    pub sms: OutboundSms,
    pub created_at: DateTime<Utc>,
    /// Earliest delivery time; later than `created_at` during quiet hours.
    pub send_after: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: Uuid,
    /// Insertion order; ties on `send_after` are broken by this.
    pub seq: i64,
    pub club_id: Uuid,
    pub from_number: String,
    pub to_number: String,
    pub body: String,
    pub kind: MessageKind,
    pub match_id: Option<Uuid>,
    pub invite_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub send_after: DateTime<Utc>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub status: DeliveryStatus,
    pub delivered_at: Option<DateTime<Utc>>,
}
