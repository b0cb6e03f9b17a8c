//! The unit of persistence: one attempt result for one player.

use chrono::NaiveDate;

/// One player's result for one Wordle puzzle.
///
/// `attempts` is `None` when the player failed the puzzle (the `X/6`
/// form). A failed game is still a record; averages simply skip it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    /// Stable platform user id; absent when the player could only be
    /// identified by display name.
    pub user_id: Option<i64>,
    /// Display name as it appeared in the message.
    pub username: String,
    /// Puzzle index.
    pub wordle_number: i32,
    /// Date the message carrying the result was posted.
    pub date: NaiveDate,
    /// Guesses used, 1 through 6; `None` for a failed puzzle.
    pub attempts: Option<i32>,
}

impl ScoreRecord {
    /// Whether the puzzle was solved.
    pub fn is_solved(&self) -> bool {
        self.attempts.is_some()
    }
}
