use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CourtError, CourtResult};

/// Quiet window in club-local hours, `[start, end)`.
///
/// `start > end` wraps past midnight; `start == end` disables the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub start: u32,
    pub end: u32,
}

impl QuietHours {
    pub fn new(start: u32, end: u32) -> CourtResult<Self> {
        if start > 23 || end > 23 {
            return Err(CourtError::Configuration(format!(
                "quiet hours must be between 0 and 23, got {}-{}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn is_disabled(&self) -> bool {
        self.start == self.end
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        if self.is_disabled() {
            false
        } else if self.wraps_midnight() {
            hour >= self.start || hour < self.end
        } else {
            hour >= self.start && hour < self.end
        }
    }
}

/// Messaging settings a club exposes to the engine. Owned by the settings
/// subsystem; the engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClubMessagingConfig {
    pub club_id: Uuid,
    pub name: String,
    pub phone_number: Option<String>,
    pub timezone: String,
    pub quiet_hours_start: Option<u32>,
    pub quiet_hours_end: Option<u32>,
    pub initial_batch_size: usize,
    pub invite_timeout_minutes: i64,
    pub feedback_delay_hours: i64,
    pub feedback_reminder_delay_hours: i64,
    pub sms_test_mode: bool,
    #[serde(default)]
    pub sms_whitelist: Vec<String>,
}

impl ClubMessagingConfig {
    /// The number outbound texts are sent from. Scheduling cannot run without it.
    pub fn sender_number(&self) -> CourtResult<&str> {
        self.phone_number
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                CourtError::Configuration(format!("club {} has no phone number", self.club_id))
            })
    }

    pub fn tz(&self) -> CourtResult<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            CourtError::Configuration(format!(
                "club {} has unknown timezone {:?}",
                self.club_id, self.timezone
            ))
        })
    }

    pub fn quiet_hours(&self) -> CourtResult<Option<QuietHours>> {
        match (self.quiet_hours_start, self.quiet_hours_end) {
            (Some(start), Some(end)) => QuietHours::new(start, end).map(Some),
            (None, None) => Ok(None),
            _ => Err(CourtError::Configuration(format!(
                "club {} has only one quiet-hours bound set",
                self.club_id
            ))),
        }
    }

    /// Checks everything the scheduler depends on, so a broken club is
    /// reported once instead of failing mid-round.
    pub fn validate(&self) -> CourtResult<()> {
        self.sender_number()?;
        self.tz()?;
        self.quiet_hours()?;
        if self.initial_batch_size == 0 {
            return Err(CourtError::Configuration(format!(
                "club {} has an initial batch size of 0",
                self.club_id
            )));
        }
        if self.invite_timeout_minutes <= 0 {
            return Err(CourtError::Configuration(format!(
                "club {} has a non-positive invite timeout",
                self.club_id
            )));
        }
        Ok(())
    }

    /// In test mode only whitelisted numbers receive texts.
    pub fn allows_recipient(&self, number: &str) -> bool {
        !self.sms_test_mode || self.sms_whitelist.iter().any(|n| n == number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub club_id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub level: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Player {
    /// Case-insensitive match on the full name or the first name.
    pub fn answers_to(&self, name: &str) -> bool {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return false;
        }
        let full = self.name.to_lowercase();
        full == wanted || full.split_whitespace().next() == Some(wanted.as_str())
    }
}
