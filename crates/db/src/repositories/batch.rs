use crate::models::DbBatch;
use courtcall_core::models::invite::Batch;
use eyre::Result;
use sqlx::PgConnection;
use uuid::Uuid;

pub async fn get_match_batches(conn: &mut PgConnection, match_id: Uuid) -> Result<Vec<DbBatch>> {
    let batches = sqlx::query_as::<_, DbBatch>(
        r#"
        SELECT id, match_id, round, idempotency_key, invite_ids, excluded_player_ids, created_at
        FROM batches
        WHERE match_id = $1
        ORDER BY round
        "#,
    )
    .bind(match_id)
    .fetch_all(conn)
    .await?;

    Ok(batches)
}

/// The unique idempotency key rejects a second batch for the same round.
pub async fn upsert_batch(conn: &mut PgConnection, batch: &Batch) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO batches (id, match_id, round, idempotency_key, invite_ids, excluded_player_ids, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE
        SET invite_ids = EXCLUDED.invite_ids
        "#,
    )
    .bind(batch.id)
    .bind(batch.match_id)
    .bind(batch.round)
    .bind(&batch.idempotency_key)
    .bind(&batch.invite_ids)
    .bind(&batch.excluded_player_ids)
    .bind(batch.created_at)
    .execute(conn)
    .await?;

    Ok(())
}
