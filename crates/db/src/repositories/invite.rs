use crate::models::DbInvite;
use courtcall_core::models::invite::Invite;
use eyre::Result;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

pub async fn get_match_invites(conn: &mut PgConnection, match_id: Uuid) -> Result<Vec<DbInvite>> {
    let invites = sqlx::query_as::<_, DbInvite>(
        r#"
        SELECT id, match_id, player_id, status, batch_id, sent_at, responded_at, created_at
        FROM invites
        WHERE match_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(match_id)
    .fetch_all(conn)
    .await?;

    Ok(invites)
}

pub async fn get_player_invites(pool: &Pool<Postgres>, player_id: Uuid) -> Result<Vec<DbInvite>> {
    let invites = sqlx::query_as::<_, DbInvite>(
        r#"
        SELECT id, match_id, player_id, status, batch_id, sent_at, responded_at, created_at
        FROM invites
        WHERE player_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(player_id)
    .fetch_all(pool)
    .await?;

    Ok(invites)
}

/// Inserts a new invite or writes the status columns of an existing one.
pub async fn upsert_invite(conn: &mut PgConnection, invite: &Invite) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO invites (id, match_id, player_id, status, batch_id, sent_at, responded_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE
        SET status = EXCLUDED.status,
            sent_at = EXCLUDED.sent_at,
            responded_at = EXCLUDED.responded_at
        "#,
    )
    .bind(invite.id)
    .bind(invite.match_id)
    .bind(invite.player_id)
    .bind(invite.status.as_str())
    .bind(invite.batch_id)
    .bind(invite.sent_at)
    .bind(invite.responded_at)
    .bind(invite.created_at)
    .execute(conn)
    .await?;

    Ok(())
}
