use crate::models::DbOutboxMessage;
use chrono::{DateTime, Utc};
use courtcall_core::models::outbox::NewOutboxMessage;
use eyre::{Result, eyre};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

const OUTBOX_COLUMNS: &str = r#"
    id, seq, club_id, from_number, to_number, body, kind, match_id, invite_id,
    created_at, send_after, attempts, last_error, status, delivered_at
"#;

pub async fn enqueue(pool: &Pool<Postgres>, message: &NewOutboxMessage) -> Result<DbOutboxMessage> {
    let row = sqlx::query_as::<_, DbOutboxMessage>(&format!(
        r#"
        INSERT INTO outbox (
            id, club_id, from_number, to_number, body, kind, match_id, invite_id,
            created_at, send_after
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {OUTBOX_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(message.club_id)
    .bind(&message.from_number)
    .bind(&message.sms.to_number)
    .bind(&message.sms.body)
    .bind(message.sms.kind.as_str())
    .bind(message.sms.match_id)
    .bind(message.sms.invite_id)
    .bind(message.created_at)
    .bind(message.send_after)
    .fetch_one(pool)
    .await?;

    tracing::debug!(
        "Queued outbox message: id={}, seq={}, send_after={}",
        row.id, row.seq, row.send_after
    );
    Ok(row)
}

/// A message is held back while an earlier one to the same number is
/// retrying or due no later than it.
pub async fn get_due_messages(
    pool: &Pool<Postgres>,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<DbOutboxMessage>> {
    let rows = sqlx::query_as::<_, DbOutboxMessage>(&format!(
        r#"
        SELECT {OUTBOX_COLUMNS}
        FROM outbox o
        WHERE o.status = 'queued'
          AND o.send_after <= $1
          AND NOT EXISTS (
              SELECT 1 FROM outbox e
              WHERE e.status = 'queued'
                AND e.to_number = o.to_number
                AND e.seq < o.seq
                AND (e.attempts > 0 OR e.send_after <= o.send_after)
          )
        ORDER BY o.send_after, o.seq
        LIMIT $2
        "#
    ))
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

fn ensure_updated(rows_affected: u64, id: Uuid) -> Result<()> {
    if rows_affected == 0 {
        return Err(eyre!("Outbox message not found: {}", id));
    }
    Ok(())
}

pub async fn mark_delivered(pool: &Pool<Postgres>, id: Uuid, now: DateTime<Utc>) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE outbox
        SET status = 'delivered', attempts = attempts + 1, last_error = NULL, delivered_at = $2
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?;

    ensure_updated(result.rows_affected(), id)
}

pub async fn schedule_retry(
    pool: &Pool<Postgres>,
    id: Uuid,
    error: &str,
    next_attempt_at: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE outbox
        SET attempts = attempts + 1, last_error = $2, send_after = $3
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(error)
    .bind(next_attempt_at)
    .execute(pool)
    .await?;

    ensure_updated(result.rows_affected(), id)
}

pub async fn mark_failed(pool: &Pool<Postgres>, id: Uuid, error: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE outbox
        SET status = 'failed', attempts = attempts + 1, last_error = $2
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(error)
    .execute(pool)
    .await?;

    ensure_updated(result.rows_affected(), id)
}

pub async fn mark_skipped(pool: &Pool<Postgres>, id: Uuid, reason: &str) -> Result<()> {
    let result = sqlx::query("UPDATE outbox SET status = 'skipped', last_error = $2 WHERE id = $1")
        .bind(id)
        .bind(reason)
        .execute(pool)
        .await?;

    ensure_updated(result.rows_affected(), id)
}

pub async fn get_failed_messages(pool: &Pool<Postgres>, limit: i64) -> Result<Vec<DbOutboxMessage>> {
    let rows = sqlx::query_as::<_, DbOutboxMessage>(&format!(
        r#"
        SELECT {OUTBOX_COLUMNS}
        FROM outbox
        WHERE status = 'failed'
        ORDER BY seq DESC
        LIMIT $1
        "#
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
