use crate::models::DbPlayer;
use chrono::Utc;
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn create_player(
    pool: &Pool<Postgres>,
    club_id: Uuid,
    name: &str,
    phone_number: &str,
    level: Option<f64>,
) -> Result<DbPlayer> {
    let id = Uuid::new_v4();

    tracing::debug!("Creating player: id={}, club_id={}", id, club_id);

    let player = sqlx::query_as::<_, DbPlayer>(
        r#"
        INSERT INTO players (id, club_id, name, phone_number, level, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, club_id, name, phone_number, level, created_at
        "#,
    )
    .bind(id)
    .bind(club_id)
    .bind(name)
    .bind(phone_number)
    .bind(level)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(player)
}

pub async fn get_player_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbPlayer>> {
    let player = sqlx::query_as::<_, DbPlayer>(
        r#"
        SELECT id, club_id, name, phone_number, level, created_at
        FROM players
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(player)
}

pub async fn get_player_by_phone(
    pool: &Pool<Postgres>,
    club_id: Uuid,
    phone_number: &str,
) -> Result<Option<DbPlayer>> {
    let player = sqlx::query_as::<_, DbPlayer>(
        r#"
        SELECT id, club_id, name, phone_number, level, created_at
        FROM players
        WHERE club_id = $1 AND phone_number = $2
        "#,
    )
    .bind(club_id)
    .bind(phone_number)
    .fetch_optional(pool)
    .await?;

    Ok(player)
}

pub async fn get_club_players(pool: &Pool<Postgres>, club_id: Uuid) -> Result<Vec<DbPlayer>> {
    let players = sqlx::query_as::<_, DbPlayer>(
        r#"
        SELECT id, club_id, name, phone_number, level, created_at
        FROM players
        WHERE club_id = $1
        ORDER BY name
        "#,
    )
    .bind(club_id)
    .fetch_all(pool)
    .await?;

    Ok(players)
}

/// Default candidate order: strongest players first, excluded ids filtered in
/// the query.
pub async fn rank_players(
    pool: &Pool<Postgres>,
    club_id: Uuid,
    exclude: &[Uuid],
    limit: i64,
) -> Result<Vec<Uuid>> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM players
        WHERE club_id = $1 AND NOT (id = ANY($2))
        ORDER BY level DESC NULLS LAST, name
        LIMIT $3
        "#,
    )
    .bind(club_id)
    .bind(exclude)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
