//! Discord integration for the guesslog bot.
//!
//! A hand-rolled client covering exactly what the bot needs: a gateway
//! session (WebSocket) for receiving messages and slash command
//! invocations, and the small slice of the REST API used for responding
//! and registering commands.
//!
//! The pieces:
//!
//! - [`DiscordBot`] owns the gateway session with reconnection,
//!   heartbeating, and identify, plus the authorized REST client.
//! - [`DiscordEventHandler`] is implemented by the application to
//!   receive ready, message, and interaction events.
//! - [`InteractionResponder`] is the narrow write path handlers use to
//!   answer interactions; production wiring hands them the bot itself,
//!   tests a recording double.

pub mod bot;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod messages;

pub use bot::{BotOptions, DiscordBot, InteractionResponder};
pub use commands::{
    CommandSpec, Interaction, InteractionResponse, InteractionResponseData, ParsedCommand,
    parse_command,
};
pub use config::DiscordConfig;
pub use error::{DiscordError, DiscordResult};
pub use events::{DiscordEventHandler, GatewayEvent, Message, ReadyEvent, User};
pub use messages::{Embed, EmbedField};
