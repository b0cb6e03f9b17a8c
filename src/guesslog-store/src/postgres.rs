//! Postgres-backed implementation of [`ScoreStore`].

use async_trait::async_trait;
use guesslog_score::ScoreRecord;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::store::{InsertOutcome, LeaderboardEntry, ScoreStore};

/// Schema for the scores table. `(username, wordle_number)` is the
/// uniqueness key the conflict-tolerant insert relies on.
const SCHEMA_SCORES: &str = r"
CREATE TABLE IF NOT EXISTS scores (
    user_id       BIGINT,
    username      TEXT NOT NULL,
    wordle_number INTEGER NOT NULL,
    date          DATE NOT NULL,
    attempts      INTEGER,
    UNIQUE (username, wordle_number)
)
";

/// Score store backed by a Postgres connection pool.
pub struct PgScoreStore {
    pool: PgPool,
}

impl PgScoreStore {
    /// Connect, sizing the pool from the configuration, and validate the
    /// connection with a round-trip before handing the store out.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(config.database_url())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        debug!(
            min = config.min_connections,
            max = config.max_connections,
            "Database pool ready"
        );
        Ok(Self { pool })
    }

    /// Create the scores table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA_SCORES).execute(&self.pool).await?;
        info!("Scores table ready");
        Ok(())
    }
}

#[async_trait]
impl ScoreStore for PgScoreStore {
    async fn insert(&self, record: &ScoreRecord) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r"
            INSERT INTO scores (user_id, username, wordle_number, date, attempts)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (username, wordle_number) DO NOTHING
            ",
        )
        .bind(record.user_id)
        .bind(&record.username)
        .bind(record.wordle_number)
        .bind(record.date)
        .bind(record.attempts)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Skipped)
        } else {
            Ok(InsertOutcome::Stored)
        }
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r"
            SELECT username,
                   AVG(attempts)::float8 AS avg_attempts,
                   COUNT(*) FILTER (WHERE attempts IS NOT NULL) AS games_played
            FROM scores
            WHERE attempts IS NOT NULL
            GROUP BY username
            ORDER BY avg_attempts ASC, games_played DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn reset(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM scores").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
