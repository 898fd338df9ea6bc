use crate::models::{DbMatch, DbPlayRequest};
use chrono::{DateTime, Utc};
use courtcall_core::models::court_match::{CourtMatch, MatchStatus};
use eyre::Result;
use sqlx::{PgConnection, PgExecutor, Pool, Postgres};
use uuid::Uuid;

const MATCH_COLUMNS: &str = r#"
    id, club_id, number, scheduled_at, status, team1, team2,
    originator_id, score, version, created_at
"#;

/// Inserts a pending match numbered after the club's current highest.
pub async fn create_match(
    pool: &Pool<Postgres>,
    club_id: Uuid,
    scheduled_at: DateTime<Utc>,
    originator_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<DbMatch> {
    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    // Serialize numbering per club
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
        .bind(club_id)
        .execute(&mut *tx)
        .await?;

    let number = sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(number), 0) + 1 FROM matches WHERE club_id = $1",
    )
    .bind(club_id)
    .fetch_one(&mut *tx)
    .await?;

    tracing::debug!(
        "Creating match: id={}, club_id={}, number={}",
        id, club_id, number
    );

    let db_match = sqlx::query_as::<_, DbMatch>(&format!(
        r#"
        INSERT INTO matches (id, club_id, number, scheduled_at, status, originator_id, created_at)
        VALUES ($1, $2, $3, $4, 'pending', $5, $6)
        RETURNING {MATCH_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(club_id)
    .bind(number)
    .bind(scheduled_at)
    .bind(originator_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(db_match)
}

pub async fn get_match_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<DbMatch>> {
    let db_match = sqlx::query_as::<_, DbMatch>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(db_match)
}

/// Row-locks the match for the rest of the transaction.
pub async fn lock_match(conn: &mut PgConnection, id: Uuid) -> Result<Option<DbMatch>> {
    let db_match = sqlx::query_as::<_, DbMatch>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(db_match)
}

pub async fn get_match_by_number(
    pool: &Pool<Postgres>,
    club_id: Uuid,
    number: i32,
) -> Result<Option<DbMatch>> {
    let db_match = sqlx::query_as::<_, DbMatch>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE club_id = $1 AND number = $2"
    ))
    .bind(club_id)
    .bind(number)
    .fetch_optional(pool)
    .await?;

    Ok(db_match)
}

pub async fn get_matches_with_status(
    pool: &Pool<Postgres>,
    status: MatchStatus,
) -> Result<Vec<DbMatch>> {
    let matches = sqlx::query_as::<_, DbMatch>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE status = $1 ORDER BY scheduled_at"
    ))
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;

    Ok(matches)
}

pub async fn get_open_matches(pool: &Pool<Postgres>, club_id: Uuid) -> Result<Vec<DbMatch>> {
    let matches = sqlx::query_as::<_, DbMatch>(&format!(
        r#"
        SELECT {MATCH_COLUMNS}
        FROM matches
        WHERE club_id = $1 AND status = 'pending'
        ORDER BY scheduled_at, number
        "#
    ))
    .bind(club_id)
    .fetch_all(pool)
    .await?;

    Ok(matches)
}

pub async fn get_matches_for_player(
    pool: &Pool<Postgres>,
    player_id: Uuid,
) -> Result<Vec<DbMatch>> {
    let matches = sqlx::query_as::<_, DbMatch>(&format!(
        r#"
        SELECT {MATCH_COLUMNS}
        FROM matches
        WHERE $1 = ANY(team1) OR $1 = ANY(team2)
        ORDER BY scheduled_at
        "#
    ))
    .bind(player_id)
    .fetch_all(pool)
    .await?;

    Ok(matches)
}

/// Writes the mutable columns and bumps the version. Fails if the row moved
/// on since `expected_version` was read.
pub async fn update_match(
    conn: &mut PgConnection,
    court_match: &CourtMatch,
    expected_version: i64,
) -> Result<i64> {
    let version = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE matches
        SET status = $2, team1 = $3, team2 = $4, score = $5, version = version + 1
        WHERE id = $1 AND version = $6
        RETURNING version
        "#,
    )
    .bind(court_match.id)
    .bind(court_match.status.as_str())
    .bind(&court_match.team1)
    .bind(&court_match.team2)
    .bind(&court_match.score)
    .bind(expected_version)
    .fetch_optional(conn)
    .await?;

    version.ok_or_else(|| {
        eyre::eyre!(
            "match {} changed concurrently (expected version {})",
            court_match.id,
            expected_version
        )
    })
}

pub async fn create_play_request(
    pool: &Pool<Postgres>,
    club_id: Uuid,
    player_id: Uuid,
    message: &str,
    now: DateTime<Utc>,
) -> Result<DbPlayRequest> {
    let request = sqlx::query_as::<_, DbPlayRequest>(
        r#"
        INSERT INTO play_requests (id, club_id, player_id, message, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, club_id, player_id, message, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(club_id)
    .bind(player_id)
    .bind(message)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(request)
}
