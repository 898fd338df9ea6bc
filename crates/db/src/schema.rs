use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Clubs carry the messaging settings the engine reads
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clubs (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            phone_number VARCHAR(32) NULL UNIQUE,
            timezone VARCHAR(64) NOT NULL DEFAULT 'UTC',
            quiet_hours_start INTEGER NULL,
            quiet_hours_end INTEGER NULL,
            initial_batch_size INTEGER NOT NULL DEFAULT 4,
            invite_timeout_minutes INTEGER NOT NULL DEFAULT 30,
            feedback_delay_hours INTEGER NOT NULL DEFAULT 2,
            feedback_reminder_delay_hours INTEGER NOT NULL DEFAULT 24,
            sms_test_mode BOOLEAN NOT NULL DEFAULT FALSE,
            sms_whitelist TEXT[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            club_id UUID NOT NULL REFERENCES clubs(id),
            name VARCHAR(255) NOT NULL,
            phone_number VARCHAR(32) NOT NULL,
            level DOUBLE PRECISION NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT unique_player_phone UNIQUE (club_id, phone_number)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Matches; version is bumped on every ledger write
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            club_id UUID NOT NULL REFERENCES clubs(id),
            number INTEGER NOT NULL,
            scheduled_at TIMESTAMP WITH TIME ZONE NOT NULL,
            status VARCHAR(16) NOT NULL DEFAULT 'pending',
            team1 UUID[] NOT NULL DEFAULT '{}',
            team2 UUID[] NOT NULL DEFAULT '{}',
            originator_id UUID NULL REFERENCES players(id),
            score TEXT NULL,
            version BIGINT NOT NULL DEFAULT 0,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT unique_match_number UNIQUE (club_id, number),
            CONSTRAINT team1_capacity CHECK (cardinality(team1) <= 2),
            CONSTRAINT team2_capacity CHECK (cardinality(team2) <= 2)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Invites are never deleted, only terminalized
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invites (
            id UUID PRIMARY KEY,
            match_id UUID NOT NULL REFERENCES matches(id),
            player_id UUID NOT NULL REFERENCES players(id),
            status VARCHAR(16) NOT NULL,
            batch_id UUID NULL,
            sent_at TIMESTAMP WITH TIME ZONE NULL,
            responded_at TIMESTAMP WITH TIME ZONE NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS batches (
            id UUID PRIMARY KEY,
            match_id UUID NOT NULL REFERENCES matches(id),
            round INTEGER NOT NULL,
            idempotency_key VARCHAR(64) NOT NULL UNIQUE,
            invite_ids UUID[] NOT NULL DEFAULT '{}',
            excluded_player_ids UUID[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Outbox drained by the delivery worker in (send_after, seq) order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS outbox (
            id UUID PRIMARY KEY,
            seq BIGSERIAL NOT NULL UNIQUE,
            club_id UUID NOT NULL REFERENCES clubs(id),
            from_number VARCHAR(32) NOT NULL,
            to_number VARCHAR(32) NOT NULL,
            body TEXT NOT NULL,
            kind VARCHAR(16) NOT NULL,
            match_id UUID NULL,
            invite_id UUID NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL,
            send_after TIMESTAMP WITH TIME ZONE NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT NULL,
            status VARCHAR(16) NOT NULL DEFAULT 'queued',
            delivered_at TIMESTAMP WITH TIME ZONE NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            match_id UUID NOT NULL REFERENCES matches(id),
            from_player_id UUID NOT NULL REFERENCES players(id),
            rated_player_id UUID NOT NULL REFERENCES players(id),
            score SMALLINT NOT NULL CHECK (score BETWEEN 1 AND 5),
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            PRIMARY KEY (match_id, from_player_id, rated_player_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback_sends (
            match_id UUID NOT NULL REFERENCES matches(id),
            player_id UUID NOT NULL REFERENCES players(id),
            kind VARCHAR(16) NOT NULL,
            sent_at TIMESTAMP WITH TIME ZONE NOT NULL,
            PRIMARY KEY (match_id, player_id, kind)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS play_requests (
            id UUID PRIMARY KEY,
            club_id UUID NOT NULL REFERENCES clubs(id),
            player_id UUID NOT NULL REFERENCES players(id),
            message TEXT NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_invites_one_active
            ON invites(match_id, player_id)
            WHERE status IN ('sent', 'maybe', 'pending_sms');
        CREATE INDEX IF NOT EXISTS idx_invites_player_id ON invites(player_id);
        CREATE INDEX IF NOT EXISTS idx_invites_match_id ON invites(match_id);
        CREATE INDEX IF NOT EXISTS idx_batches_match_id ON batches(match_id);
        CREATE INDEX IF NOT EXISTS idx_matches_club_status ON matches(club_id, status);
        CREATE INDEX IF NOT EXISTS idx_outbox_due ON outbox(status, send_after, seq);
        CREATE INDEX IF NOT EXISTS idx_outbox_recipient ON outbox(to_number, seq) WHERE status = 'queued';
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database schema initialized successfully.");
    Ok(())
}
