//! Score grammar matching and record extraction.
//!
//! Two grammars are recognized. The single-result grammar matches a
//! player's own share text anywhere in a message, case-insensitively:
//!
//! ```text
//! Wordle 732 4/6
//! ```
//!
//! The summary grammar matches a daily digest posted by a companion
//! service. The message contains a fixed marker line followed by one
//! line per attempt count:
//!
//! ```text
//! Here are yesterday's results:
//! 3/6: @alice @bob
//! X/6: @carol
//! ```
//!
//! Summary messages name a puzzle only by date, so the puzzle index is
//! derived from the message date and the first puzzle's epoch. The digest
//! reports *yesterday's* puzzle but the derivation intentionally counts
//! whole days from the epoch to the posting date, matching the numbers
//! the deployed tracker has always stored.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::message::MessageView;
use crate::record::ScoreRecord;

/// Marker line that identifies a summary message.
pub const SUMMARY_MARKER: &str = "Here are yesterday's results:";

/// Matches a pasted share header like `Wordle 732 4/6` or `wordle 732 X/6`.
static SINGLE_RESULT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Wordle\s+(\d+)\s+(\d|X)/6").expect("Invalid single result regex"));

/// Matches one summary line like `3/6: @alice @bob`. Case-sensitive: the
/// digest always writes a failed puzzle as a capital `X`.
static SUMMARY_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d|X)/6:\s+(.*)").expect("Invalid summary line regex"));

/// Fallback mention scan for summary lines when the platform attached no
/// structured mentions.
static FALLBACK_MENTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[^\s]+").expect("Invalid fallback mention regex"));

/// Date of Wordle #0.
static WORDLE_EPOCH: LazyLock<NaiveDate> =
    LazyLock::new(|| NaiveDate::from_ymd_opt(2021, 6, 19).expect("Invalid epoch date"));

/// Puzzle index for a summary message posted on `date`.
pub fn wordle_number_for(date: NaiveDate) -> i32 {
    (date - *WORDLE_EPOCH).num_days() as i32
}

/// Which grammars matched a message, computed once and dispatched on.
///
/// The two grammars are independent; a single message can carry both a
/// pasted share and a digest, and each contributes records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A player posted their own result.
    SingleResult,
    /// A companion service posted the previous day's digest.
    Summary,
    /// Both grammars matched in the same message.
    Both,
    /// Neither grammar matched.
    NoMatch,
}

/// Classify a message body against both grammars.
pub fn classify(content: &str) -> Classification {
    let single = SINGLE_RESULT_REGEX.is_match(content);
    let summary = content.contains(SUMMARY_MARKER);
    match (single, summary) {
        (true, true) => Classification::Both,
        (true, false) => Classification::SingleResult,
        (false, true) => Classification::Summary,
        (false, false) => Classification::NoMatch,
    }
}

/// Extract every score record a message carries.
///
/// Returns an empty vector for messages that match neither grammar, so
/// callers can feed all traffic through without pre-filtering.
pub fn extract(view: &MessageView<'_>) -> Vec<ScoreRecord> {
    match classify(view.content) {
        Classification::SingleResult => extract_single(view).into_iter().collect(),
        Classification::Summary => extract_summary(view),
        Classification::Both => {
            let mut records: Vec<ScoreRecord> = extract_single(view).into_iter().collect();
            records.extend(extract_summary(view));
            records
        }
        Classification::NoMatch => Vec::new(),
    }
}

/// Extract the author's own result from a pasted share.
///
/// Only the first match counts; a quoted or repeated share in the same
/// message does not produce a second record.
pub fn extract_single(view: &MessageView<'_>) -> Option<ScoreRecord> {
    let caps = SINGLE_RESULT_REGEX.captures(view.content)?;
    let wordle_number: i32 = caps[1].parse().ok()?;
    Some(ScoreRecord {
        user_id: view.author_id,
        username: view.author_name.to_string(),
        wordle_number,
        date: view.created_on,
        attempts: parse_attempts(&caps[2]),
    })
}

/// Extract one record per named player from a summary digest.
///
/// When the platform attached structured mentions, each mention is
/// credited on the lines that name it, either as `@name` or as the raw
/// `<@id>` markup. Without structured mentions every `@word` token on a
/// matching line becomes a record with no resolved identity. Lines that
/// do not match the grammar are skipped.
pub fn extract_summary(view: &MessageView<'_>) -> Vec<ScoreRecord> {
    let wordle_number = wordle_number_for(view.created_on);
    let mut records = Vec::new();

    for line in view.content.lines() {
        let Some(caps) = SUMMARY_LINE_REGEX.captures(line) else {
            continue;
        };
        let attempts = parse_attempts(&caps[1]);
        let segment = &caps[2];

        if view.mentions.is_empty() {
            for token in FALLBACK_MENTION_REGEX.find_iter(segment) {
                records.push(ScoreRecord {
                    user_id: None,
                    username: token.as_str().to_string(),
                    wordle_number,
                    date: view.created_on,
                    attempts,
                });
            }
        } else {
            for mention in view.mentions {
                let by_name = segment.contains(&format!("@{}", mention.name));
                let by_id = segment.contains(&format!("<@{}>", mention.id));
                if by_name || by_id {
                    records.push(ScoreRecord {
                        user_id: Some(mention.id),
                        username: mention.name.clone(),
                        wordle_number,
                        date: view.created_on,
                        attempts,
                    });
                }
            }
        }
    }

    records
}

/// Parse the attempts token of either grammar. `X` (any case) means the
/// puzzle was failed and maps to `None`, not zero.
fn parse_attempts(token: &str) -> Option<i32> {
    if token.eq_ignore_ascii_case("x") {
        None
    } else {
        token.parse().ok()
    }
}
