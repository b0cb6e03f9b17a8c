//! Score persistence for the guesslog bot.
//!
//! Storage is reached through the [`ScoreStore`] trait so callers can be
//! handed an explicit store handle (and tests a double). The production
//! implementation, [`PgScoreStore`], keeps one row per player per puzzle
//! in Postgres and treats duplicate submissions as no-ops.
//!
//! Typical flow:
//!
//! ```rust,no_run
//! use guesslog_store::{PgScoreStore, StoreConfig, record_batch};
//!
//! # async fn run(records: Vec<guesslog_score::ScoreRecord>) -> guesslog_store::Result<()> {
//! let config = StoreConfig::from_env()?;
//! let store = PgScoreStore::connect(&config).await?;
//! store.ensure_schema().await?;
//!
//! let outcomes = record_batch(&store, &records).await;
//! # let _ = outcomes;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod postgres;
pub mod store;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use postgres::PgScoreStore;
pub use store::{InsertOutcome, LeaderboardEntry, RecordOutcome, ScoreStore, record_batch};
