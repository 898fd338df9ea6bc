use crate::models::DbFeedbackSend;
use courtcall_core::models::feedback::{FeedbackEntry, FeedbackKind, FeedbackSend};
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_responders(pool: &Pool<Postgres>, match_id: Uuid) -> Result<Vec<Uuid>> {
    let responders = sqlx::query_scalar::<_, Uuid>(
        "SELECT DISTINCT from_player_id FROM feedback WHERE match_id = $1",
    )
    .bind(match_id)
    .fetch_all(pool)
    .await?;

    Ok(responders)
}

/// Re-rating the same player overwrites the earlier score.
pub async fn record_feedback(pool: &Pool<Postgres>, entry: &FeedbackEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO feedback (match_id, from_player_id, rated_player_id, score, created_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (match_id, from_player_id, rated_player_id)
        DO UPDATE SET score = EXCLUDED.score, created_at = EXCLUDED.created_at
        "#,
    )
    .bind(entry.match_id)
    .bind(entry.from_player_id)
    .bind(entry.rated_player_id)
    .bind(i16::from(entry.score))
    .bind(entry.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_sends(
    pool: &Pool<Postgres>,
    match_id: Uuid,
    kind: FeedbackKind,
) -> Result<Vec<DbFeedbackSend>> {
    let sends = sqlx::query_as::<_, DbFeedbackSend>(
        r#"
        SELECT match_id, player_id, kind, sent_at
        FROM feedback_sends
        WHERE match_id = $1 AND kind = $2
        ORDER BY sent_at
        "#,
    )
    .bind(match_id)
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;

    Ok(sends)
}

/// Returns whether this call owns the send. `force` refreshes an existing
/// claim instead of yielding to it.
pub async fn claim_send(pool: &Pool<Postgres>, send: &FeedbackSend, force: bool) -> Result<bool> {
    let query = if force {
        r#"
        INSERT INTO feedback_sends (match_id, player_id, kind, sent_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (match_id, player_id, kind) DO UPDATE SET sent_at = EXCLUDED.sent_at
        "#
    } else {
        r#"
        INSERT INTO feedback_sends (match_id, player_id, kind, sent_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (match_id, player_id, kind) DO NOTHING
        "#
    };

    let result = sqlx::query(query)
        .bind(send.match_id)
        .bind(send.player_id)
        .bind(send.kind.as_str())
        .bind(send.sent_at)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn release_send(
    pool: &Pool<Postgres>,
    match_id: Uuid,
    player_id: Uuid,
    kind: FeedbackKind,
) -> Result<()> {
    sqlx::query("DELETE FROM feedback_sends WHERE match_id = $1 AND player_id = $2 AND kind = $3")
        .bind(match_id)
        .bind(player_id)
        .bind(kind.as_str())
        .execute(pool)
        .await?;

    Ok(())
}
