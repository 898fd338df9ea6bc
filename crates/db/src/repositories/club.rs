use crate::models::DbClub;
use chrono::Utc;
use courtcall_core::models::club::ClubMessagingConfig;
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

const CLUB_COLUMNS: &str = r#"
    id, name, phone_number, timezone, quiet_hours_start, quiet_hours_end,
    initial_batch_size, invite_timeout_minutes, feedback_delay_hours,
    feedback_reminder_delay_hours, sms_test_mode, sms_whitelist, created_at
"#;

pub async fn create_club(pool: &Pool<Postgres>, club: &ClubMessagingConfig) -> Result<DbClub> {
    tracing::debug!("Creating club: id={}, name={}", club.club_id, club.name);

    let db_club = sqlx::query_as::<_, DbClub>(&format!(
        r#"
        INSERT INTO clubs (
            id, name, phone_number, timezone, quiet_hours_start, quiet_hours_end,
            initial_batch_size, invite_timeout_minutes, feedback_delay_hours,
            feedback_reminder_delay_hours, sms_test_mode, sms_whitelist, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING {CLUB_COLUMNS}
        "#
    ))
    .bind(club.club_id)
    .bind(&club.name)
    .bind(&club.phone_number)
    .bind(&club.timezone)
    .bind(club.quiet_hours_start.map(|h| h as i32))
    .bind(club.quiet_hours_end.map(|h| h as i32))
    .bind(i32::try_from(club.initial_batch_size)?)
    .bind(i32::try_from(club.invite_timeout_minutes)?)
    .bind(i32::try_from(club.feedback_delay_hours)?)
    .bind(i32::try_from(club.feedback_reminder_delay_hours)?)
    .bind(club.sms_test_mode)
    .bind(&club.sms_whitelist)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(db_club)
}

pub async fn get_club_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbClub>> {
    let club = sqlx::query_as::<_, DbClub>(&format!(
        "SELECT {CLUB_COLUMNS} FROM clubs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(club)
}

pub async fn get_club_by_phone(pool: &Pool<Postgres>, phone_number: &str) -> Result<Option<DbClub>> {
    let club = sqlx::query_as::<_, DbClub>(&format!(
        "SELECT {CLUB_COLUMNS} FROM clubs WHERE phone_number = $1"
    ))
    .bind(phone_number)
    .fetch_optional(pool)
    .await?;

    if club.is_none() {
        tracing::debug!("No club owns number {}", phone_number);
    }

    Ok(club)
}
