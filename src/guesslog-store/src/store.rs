//! The storage abstraction and batch persistence.

use async_trait::async_trait;
use guesslog_score::ScoreRecord;
use tracing::{debug, warn};

use crate::error::Result;

/// Result of one conflict-tolerant insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Stored,
    /// A row already existed for the same player and puzzle; the
    /// earlier submission stands.
    Skipped,
}

/// Per-record outcome of a batch persistence attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The record was written.
    Stored { username: String },
    /// A duplicate was dropped in favor of the existing row.
    Skipped { username: String },
    /// The insert failed; siblings in the batch were unaffected.
    Failed { username: String, reason: String },
}

/// One row of the ranked leaderboard.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    /// Mean guesses across solved puzzles.
    pub avg_attempts: f64,
    /// Solved puzzles counted into the average.
    pub games_played: i64,
}

/// Durable, idempotent storage for score records.
///
/// Implementations must treat `(username, wordle_number)` as the
/// uniqueness key: re-inserting a record for an existing key keeps the
/// first row and reports [`InsertOutcome::Skipped`].
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Insert one record, keeping any existing row for the same key.
    async fn insert(&self, record: &ScoreRecord) -> Result<InsertOutcome>;

    /// Ranked aggregate over solved puzzles only: lowest average attempts
    /// first, ties broken by more games played, at most `limit` rows.
    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>>;

    /// Delete every stored record, returning how many were removed.
    async fn reset(&self) -> Result<u64>;
}

/// Persist a batch of records, attempting each one independently.
///
/// A failed insert never aborts its siblings; callers get one outcome
/// per input record, in input order.
pub async fn record_batch(store: &dyn ScoreStore, records: &[ScoreRecord]) -> Vec<RecordOutcome> {
    let mut outcomes = Vec::with_capacity(records.len());

    for record in records {
        match store.insert(record).await {
            Ok(InsertOutcome::Stored) => {
                debug!(user = %record.username, wordle = record.wordle_number, "Stored score");
                outcomes.push(RecordOutcome::Stored { username: record.username.clone() });
            }
            Ok(InsertOutcome::Skipped) => {
                debug!(user = %record.username, wordle = record.wordle_number, "Duplicate score skipped");
                outcomes.push(RecordOutcome::Skipped { username: record.username.clone() });
            }
            Err(e) => {
                warn!(user = %record.username, error = %e, "Failed to store score");
                outcomes.push(RecordOutcome::Failed {
                    username: record.username.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::StoreError;

    /// In-memory store with the same uniqueness and ranking contract as
    /// the Postgres implementation.
    #[derive(Default)]
    struct MemStore {
        rows: Mutex<Vec<ScoreRecord>>,
        fail_username: Option<String>,
    }

    impl MemStore {
        fn failing_for(username: &str) -> Self {
            Self { rows: Mutex::new(Vec::new()), fail_username: Some(username.to_string()) }
        }

        fn row_count(&self) -> usize {
            self.rows.lock().unwrap().len()
        }

        fn first_attempts_for(&self, username: &str, wordle_number: i32) -> Option<i32> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.username == username && r.wordle_number == wordle_number)
                .and_then(|r| r.attempts)
        }
    }

    #[async_trait]
    impl ScoreStore for MemStore {
        async fn insert(&self, record: &ScoreRecord) -> Result<InsertOutcome> {
            if self.fail_username.as_deref() == Some(record.username.as_str()) {
                return Err(StoreError::Connection("connection reset".to_string()));
            }
            let mut rows = self.rows.lock().unwrap();
            let exists = rows
                .iter()
                .any(|r| r.username == record.username && r.wordle_number == record.wordle_number);
            if exists {
                return Ok(InsertOutcome::Skipped);
            }
            rows.push(record.clone());
            Ok(InsertOutcome::Stored)
        }

        async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
            let rows = self.rows.lock().unwrap();
            let mut by_user: Vec<(String, f64, i64)> = Vec::new();
            for row in rows.iter().filter(|r| r.attempts.is_some()) {
                match by_user.iter_mut().find(|(name, _, _)| *name == row.username) {
                    Some((_, total, games)) => {
                        *total += f64::from(row.attempts.unwrap());
                        *games += 1;
                    }
                    None => by_user.push((row.username.clone(), f64::from(row.attempts.unwrap()), 1)),
                }
            }
            let mut entries: Vec<LeaderboardEntry> = by_user
                .into_iter()
                .map(|(username, total, games)| LeaderboardEntry {
                    username,
                    avg_attempts: total / games as f64,
                    games_played: games,
                })
                .collect();
            entries.sort_by(|a, b| {
                a.avg_attempts
                    .partial_cmp(&b.avg_attempts)
                    .unwrap()
                    .then(b.games_played.cmp(&a.games_played))
            });
            entries.truncate(limit as usize);
            Ok(entries)
        }

        async fn reset(&self) -> Result<u64> {
            let mut rows = self.rows.lock().unwrap();
            let deleted = rows.len() as u64;
            rows.clear();
            Ok(deleted)
        }
    }

    fn record(username: &str, wordle_number: i32, attempts: Option<i32>) -> ScoreRecord {
        ScoreRecord {
            user_id: Some(1),
            username: username.to_string(),
            wordle_number,
            date: NaiveDate::from_ymd_opt(2023, 6, 21).unwrap(),
            attempts,
        }
    }

    #[tokio::test]
    async fn test_batch_stores_new_records() {
        let store = MemStore::default();
        let records = vec![record("alice", 732, Some(4)), record("bob", 732, Some(3))];

        let outcomes = record_batch(&store, &records).await;

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(&outcomes[0], RecordOutcome::Stored { username } if username == "alice"));
        assert!(matches!(&outcomes[1], RecordOutcome::Stored { username } if username == "bob"));
        assert_eq!(store.row_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_keeps_first_submission() {
        let store = MemStore::default();

        record_batch(&store, &[record("alice", 732, Some(4))]).await;
        let outcomes = record_batch(&store, &[record("alice", 732, Some(2))]).await;

        assert!(matches!(&outcomes[0], RecordOutcome::Skipped { username } if username == "alice"));
        assert_eq!(store.row_count(), 1);
        assert_eq!(store.first_attempts_for("alice", 732), Some(4));
    }

    #[tokio::test]
    async fn test_same_player_different_puzzles_both_stored() {
        let store = MemStore::default();
        let records = vec![record("alice", 732, Some(4)), record("alice", 733, Some(3))];

        let outcomes = record_batch(&store, &records).await;

        assert!(outcomes.iter().all(|o| matches!(o, RecordOutcome::Stored { .. })));
        assert_eq!(store.row_count(), 2);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_siblings() {
        let store = MemStore::failing_for("bob");
        let records = vec![
            record("alice", 732, Some(4)),
            record("bob", 732, Some(3)),
            record("carol", 732, Some(5)),
        ];

        let outcomes = record_batch(&store, &records).await;

        assert!(matches!(&outcomes[0], RecordOutcome::Stored { .. }));
        assert!(matches!(&outcomes[1], RecordOutcome::Failed { username, reason }
            if username == "bob" && reason.contains("connection reset")));
        assert!(matches!(&outcomes[2], RecordOutcome::Stored { .. }));
        assert_eq!(store.row_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_yields_no_outcomes() {
        let store = MemStore::default();
        let outcomes = record_batch(&store, &[]).await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_average_then_games() {
        let store = MemStore::default();
        let mut records = Vec::new();
        // carol: avg 2.5 over 4 games.
        records.push(record("carol", 1, Some(2)));
        records.push(record("carol", 2, Some(2)));
        records.push(record("carol", 3, Some(3)));
        records.push(record("carol", 4, Some(3)));
        records.push(record("carol", 5, None));
        // bob: avg 3.0 over 8 games.
        for n in 1..=8 {
            records.push(record("bob", n, Some(3)));
        }
        // alice: avg 3.0 over 5 games.
        for n in 1..=5 {
            records.push(record("alice", n, Some(3)));
        }

        record_batch(&store, &records).await;
        let entries = store.leaderboard(10).await.unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["carol", "bob", "alice"]);
        assert_eq!(entries[0].avg_attempts, 2.5);
        assert_eq!(entries[0].games_played, 4);
    }

    #[tokio::test]
    async fn test_leaderboard_ignores_failed_puzzles() {
        let store = MemStore::default();
        record_batch(&store, &[record("alice", 1, None), record("alice", 2, None)]).await;

        let entries = store.leaderboard(10).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_leaderboard_respects_limit() {
        let store = MemStore::default();
        let records: Vec<ScoreRecord> = (0..5)
            .map(|i| record(&format!("player{}", i), 1, Some(i + 1)))
            .collect();
        record_batch(&store, &records).await;

        let entries = store.leaderboard(3).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].username, "player0");
    }

    #[tokio::test]
    async fn test_reset_reports_deleted_rows() {
        let store = MemStore::default();
        record_batch(&store, &[record("alice", 1, Some(3)), record("bob", 1, Some(4))]).await;

        assert_eq!(store.reset().await.unwrap(), 2);
        assert_eq!(store.row_count(), 0);
        assert_eq!(store.reset().await.unwrap(), 0);
    }
}
