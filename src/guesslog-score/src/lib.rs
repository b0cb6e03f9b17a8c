//! Wordle score extraction for the guesslog bot.
//!
//! This crate turns raw chat messages into [`ScoreRecord`]s. It knows the
//! two shapes a score arrives in:
//!
//! - **Single result**: a player pastes their own share text, e.g.
//!   `Wordle 732 4/6` (an `X` means the puzzle was failed).
//! - **Summary**: a companion service posts the previous day's results as
//!   one message with a line per attempt count, e.g. `3/6: @alice @bob`.
//!
//! The crate is platform-free: callers describe an inbound message as a
//! [`MessageView`] and get back zero or more records. It performs no I/O
//! and holds no state.
//!
//! # Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use guesslog_score::{extract, MessageView};
//!
//! let view = MessageView {
//!     author_id: Some(42),
//!     author_name: "alice",
//!     content: "Wordle 732 4/6\n\n⬛🟨⬛⬛⬛",
//!     created_on: NaiveDate::from_ymd_opt(2023, 6, 21).unwrap(),
//!     mentions: &[],
//! };
//!
//! let records = extract(&view);
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].wordle_number, 732);
//! assert_eq!(records[0].attempts, Some(4));
//! ```

pub mod extract;
pub mod message;
pub mod record;

pub use extract::{Classification, classify, extract, extract_single, extract_summary, wordle_number_for};
pub use message::{Mention, MessageView};
pub use record::ScoreRecord;
