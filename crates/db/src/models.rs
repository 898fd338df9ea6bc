use chrono::{DateTime, Utc};
use courtcall_core::models::club::{ClubMessagingConfig, Player};
use courtcall_core::models::court_match::{CourtMatch, PlayRequest};
use courtcall_core::models::feedback::{FeedbackEntry, FeedbackSend};
use courtcall_core::models::invite::{Batch, Invite};
use courtcall_core::models::outbox::OutboxMessage;
use eyre::{Report, eyre};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbClub {
    pub id: Uuid,
    pub name: String,
    pub phone_number: Option<String>,
    pub timezone: String,
    pub quiet_hours_start: Option<i32>,
    pub quiet_hours_end: Option<i32>,
    pub initial_batch_size: i32,
    pub invite_timeout_minutes: i32,
    pub feedback_delay_hours: i32,
    pub feedback_reminder_delay_hours: i32,
    pub sms_test_mode: bool,
    pub sms_whitelist: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbPlayer {
    pub id: Uuid,
    pub club_id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub level: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbMatch {
    pub id: Uuid,
    pub club_id: Uuid,
    pub number: i32,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
    pub team1: Vec<Uuid>,
    pub team2: Vec<Uuid>,
    pub originator_id: Option<Uuid>,
    pub score: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbInvite {
    pub id: Uuid,
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub status: String,
    pub batch_id: Option<Uuid>,
    pub sent_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbBatch {
    pub id: Uuid,
    pub match_id: Uuid,
    pub round: i32,
    pub idempotency_key: String,
    pub invite_ids: Vec<Uuid>,
    pub excluded_player_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbOutboxMessage {
    pub id: Uuid,
    pub seq: i64,
    pub club_id: Uuid,
    pub from_number: String,
    pub to_number: String,
    pub body: String,
    pub kind: String,
    pub match_id: Option<Uuid>,
    pub invite_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub send_after: DateTime<Utc>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub status: String,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbFeedback {
    pub match_id: Uuid,
    pub from_player_id: Uuid,
    pub rated_player_id: Uuid,
    pub score: i16,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbFeedbackSend {
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub kind: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbPlayRequest {
    pub id: Uuid,
    pub club_id: Uuid,
    pub player_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

// Out-of-range hours are mapped past 23 so club validation reports them.
fn hour(value: Option<i32>) -> Option<u32> {
    value.map(|h| u32::try_from(h).unwrap_or(u32::MAX))
}

impl From<DbClub> for ClubMessagingConfig {
    fn from(row: DbClub) -> Self {
        Self {
            club_id: row.id,
            name: row.name,
            phone_number: row.phone_number,
            timezone: row.timezone,
            quiet_hours_start: hour(row.quiet_hours_start),
            quiet_hours_end: hour(row.quiet_hours_end),
            initial_batch_size: usize::try_from(row.initial_batch_size).unwrap_or(0),
            invite_timeout_minutes: i64::from(row.invite_timeout_minutes),
            feedback_delay_hours: i64::from(row.feedback_delay_hours),
            feedback_reminder_delay_hours: i64::from(row.feedback_reminder_delay_hours),
            sms_test_mode: row.sms_test_mode,
            sms_whitelist: row.sms_whitelist,
        }
    }
}

impl From<DbPlayer> for Player {
    fn from(row: DbPlayer) -> Self {
        Self {
            id: row.id,
            club_id: row.club_id,
            name: row.name,
            phone_number: row.phone_number,
            level: row.level,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<DbMatch> for CourtMatch {
    type Error = Report;

    fn try_from(row: DbMatch) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            club_id: row.club_id,
            number: row.number,
            scheduled_at: row.scheduled_at,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            team1: row.team1,
            team2: row.team2,
            originator_id: row.originator_id,
            score: row.score,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DbInvite> for Invite {
    type Error = Report;

    fn try_from(row: DbInvite) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            match_id: row.match_id,
            player_id: row.player_id,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            batch_id: row.batch_id,
            sent_at: row.sent_at,
            responded_at: row.responded_at,
            created_at: row.created_at,
        })
    }
}

impl From<DbBatch> for Batch {
    fn from(row: DbBatch) -> Self {
        Self {
            id: row.id,
            match_id: row.match_id,
            round: row.round,
            idempotency_key: row.idempotency_key,
            invite_ids: row.invite_ids,
            excluded_player_ids: row.excluded_player_ids,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<DbOutboxMessage> for OutboxMessage {
    type Error = Report;

    fn try_from(row: DbOutboxMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            seq: row.seq,
            club_id: row.club_id,
            from_number: row.from_number,
            to_number: row.to_number,
            body: row.body,
            kind: row.kind.parse().map_err(|e: String| eyre!(e))?,
            match_id: row.match_id,
            invite_id: row.invite_id,
            created_at: row.created_at,
            send_after: row.send_after,
            attempts: row.attempts,
            last_error: row.last_error,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            delivered_at: row.delivered_at,
        })
    }
}

impl TryFrom<DbFeedback> for FeedbackEntry {
    type Error = Report;

    fn try_from(row: DbFeedback) -> Result<Self, Self::Error> {
        Ok(Self {
            match_id: row.match_id,
            from_player_id: row.from_player_id,
            rated_player_id: row.rated_player_id,
            score: u8::try_from(row.score)?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DbFeedbackSend> for FeedbackSend {
    type Error = Report;

    fn try_from(row: DbFeedbackSend) -> Result<Self, Self::Error> {
        Ok(Self {
            match_id: row.match_id,
            player_id: row.player_id,
            kind: row.kind.parse().map_err(|e: String| eyre!(e))?,
            sent_at: row.sent_at,
        })
    }
}

impl From<DbPlayRequest> for PlayRequest {
    fn from(row: DbPlayRequest) -> Self {
        Self {
            id: row.id,
            club_id: row.club_id,
            player_id: row.player_id,
            message: row.message,
            created_at: row.created_at,
        }
    }
}
