//! Platform-neutral view of an inbound chat message.

use chrono::NaiveDate;

/// A structurally attached mention on a message.
///
/// Chat platforms resolve `@name` markup into stable user references
/// before the message reaches us; this is one such reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    /// Stable platform user id.
    pub id: i64,
    /// Display name, without the leading `@`.
    pub name: String,
}

/// One inbound chat message as the extractor sees it.
///
/// Borrowed so callers can lend their own payload types without copying
/// message bodies around.
#[derive(Debug, Clone, Copy)]
pub struct MessageView<'a> {
    /// Stable platform id of the author, when resolvable.
    pub author_id: Option<i64>,
    /// Display name of the author.
    pub author_name: &'a str,
    /// Full message text.
    pub content: &'a str,
    /// Calendar date the message was created on.
    pub created_on: NaiveDate,
    /// Structured mentions the platform attached, if any.
    pub mentions: &'a [Mention],
}
