//! Database Connection Pool using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::error::StoreResult;

pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    pub async fn new(connection_string: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await?;

        info!(max_connections, "Connected to PostgreSQL");

        Ok(Self { pool })
    }

    /// Create the `skillswap` schema, tables and indexes if missing
    pub async fn init_schema(&self) -> StoreResult<()> {
        info!("Initializing database schema...");

        sqlx::query("CREATE SCHEMA IF NOT EXISTS skillswap")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS skillswap.users (
                id UUID PRIMARY KEY,
                username VARCHAR(255) NOT NULL UNIQUE,
                skills_offered TEXT[] NOT NULL DEFAULT '{}',
                skills_wanted TEXT[] NOT NULL DEFAULT '{}',
                availability VARCHAR(16) NOT NULL DEFAULT 'Flexible',
                bio TEXT NOT NULL DEFAULT '',
                skill_points BIGINT NOT NULL DEFAULT 0 CHECK (skill_points >= 0),
                credits BIGINT NOT NULL DEFAULT 0 CHECK (credits >= 0),
                completed_swaps INTEGER NOT NULL DEFAULT 0 CHECK (completed_swaps >= 0),
                badges TEXT[] NOT NULL DEFAULT '{}',
                average_rating DOUBLE PRECISION NOT NULL DEFAULT 0.0,
                total_ratings INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS skillswap.swaps (
                id UUID PRIMARY KEY,
                seq BIGSERIAL NOT NULL,
                requester UUID NOT NULL REFERENCES skillswap.users(id),
                recipient UUID NOT NULL REFERENCES skillswap.users(id),
                requester_skill TEXT NOT NULL CHECK (requester_skill <> ''),
                recipient_skill TEXT NOT NULL CHECK (recipient_skill <> ''),
                status VARCHAR(16) NOT NULL
                    CHECK (status IN ('pending', 'accepted', 'rejected', 'completed')),
                message TEXT,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                completed_date TIMESTAMP WITH TIME ZONE
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS skillswap.reviews (
                id UUID PRIMARY KEY,
                seq BIGSERIAL NOT NULL,
                reviewer UUID NOT NULL REFERENCES skillswap.users(id),
                reviewed UUID NOT NULL REFERENCES skillswap.users(id),
                swap_id UUID NOT NULL REFERENCES skillswap.swaps(id),
                rating SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
                comment TEXT,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                UNIQUE (reviewer, swap_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // Insertion sequence breaks created_at ties in listings
        for table in ["swaps", "reviews"] {
            sqlx::query(&format!(
                "ALTER TABLE skillswap.{} ADD COLUMN IF NOT EXISTS seq BIGSERIAL NOT NULL",
                table
            ))
            .execute(&self.pool)
            .await?;
        }

        // At most one pending swap per ordered (requester, recipient) pair
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_swaps_one_pending \
             ON skillswap.swaps(requester, recipient) WHERE status = 'pending'",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_swaps_requester ON skillswap.swaps(requester, created_at DESC, seq DESC)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_swaps_recipient ON skillswap.swaps(recipient, created_at DESC, seq DESC)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_reviewed ON skillswap.reviews(reviewed, created_at DESC, seq DESC)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_reviewer ON skillswap.reviews(reviewer, created_at DESC, seq DESC)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_skill_points ON skillswap.users(skill_points DESC, id)")
            .execute(&self.pool)
            .await?;

        info!("Database schema initialized");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
