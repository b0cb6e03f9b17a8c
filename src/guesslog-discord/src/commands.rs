//! Slash command payloads, parsing, and responses.

use serde::{Deserialize, Serialize};

use crate::events::User;
use crate::messages::Embed;

/// Interaction type for application commands.
pub const INTERACTION_TYPE_APPLICATION_COMMAND: u8 = 2;

/// Response type: reply immediately with a message.
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;

/// Response type: acknowledge now, send the message later as a followup.
pub const RESPONSE_DEFERRED_CHANNEL_MESSAGE: u8 = 5;

/// Message flag marking a reply visible only to the invoker.
pub const FLAG_EPHEMERAL: u64 = 1 << 6;

/// Administrator bit in a permission set.
pub const PERMISSION_ADMINISTRATOR: u64 = 1 << 3;

/// An interaction delivered over the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    /// One-time token for responding to this interaction.
    pub token: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<InteractionData>,
    /// Present when invoked from a guild.
    #[serde(default)]
    pub member: Option<GuildMember>,
    /// Present when invoked from a direct message.
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// The command portion of an interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionData {
    pub name: String,
}

/// Guild membership attached to a guild interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMember {
    #[serde(default)]
    pub user: Option<User>,
    /// Permissions resolved for the invoking member in the channel, as a
    /// decimal string of bits.
    #[serde(default)]
    pub permissions: Option<String>,
}

impl Interaction {
    /// The invoking user, wherever the payload carries it.
    pub fn invoker(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
    }

    /// Whether the invoker holds the administrator permission.
    ///
    /// Direct-message interactions carry no permission set and are never
    /// administrators.
    pub fn invoker_is_admin(&self) -> bool {
        self.member
            .as_ref()
            .and_then(|m| m.permissions.as_deref())
            .and_then(|p| p.parse::<u64>().ok())
            .map(|bits| bits & PERMISSION_ADMINISTRATOR != 0)
            .unwrap_or(false)
    }
}

/// Parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    /// `/leaderboard` - show the ranked score table.
    Leaderboard,
    /// `/resetleaderboard` - wipe all stored scores after confirmation.
    ResetLeaderboard,
    /// Any command we did not register.
    Unknown(String),
}

/// Parse the command name out of an interaction.
pub fn parse_command(interaction: &Interaction) -> ParsedCommand {
    let name = interaction
        .data
        .as_ref()
        .map(|d| d.name.as_str())
        .unwrap_or_default();

    match name {
        "leaderboard" => ParsedCommand::Leaderboard,
        "resetleaderboard" => ParsedCommand::ResetLeaderboard,
        other => ParsedCommand::Unknown(other.to_string()),
    }
}

/// Body of an interaction response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl InteractionResponseData {
    /// Set the plain-text content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Attach an embed.
    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.get_or_insert_with(Vec::new).push(embed);
        self
    }
}

/// Response to an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionResponseData>,
}

impl InteractionResponse {
    /// Immediate text reply.
    pub fn channel_message(text: impl Into<String>) -> Self {
        Self {
            kind: RESPONSE_CHANNEL_MESSAGE,
            data: Some(InteractionResponseData::default().with_content(text)),
        }
    }

    /// Acknowledge now; the actual reply follows as a followup message.
    pub fn deferred() -> Self {
        Self {
            kind: RESPONSE_DEFERRED_CHANNEL_MESSAGE,
            data: None,
        }
    }

    /// Make the reply visible only to the invoker.
    pub fn ephemeral(mut self) -> Self {
        let data = self.data.get_or_insert_with(InteractionResponseData::default);
        data.flags = Some(data.flags.unwrap_or(0) | FLAG_EPHEMERAL);
        self
    }
}

/// Definition of a slash command for registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}
