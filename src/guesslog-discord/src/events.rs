//! Gateway frames, dispatch payloads, and event handling.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::commands::Interaction;
use crate::error::{DiscordError, DiscordResult};

/// Gateway op codes (API v10).
pub mod op {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RESUME: u8 = 6;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Gateway intents. The message content intent is privileged and must
/// also be enabled in the developer portal.
pub mod intents {
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    pub const MESSAGE_CONTENT: u64 = 1 << 15;
}

/// One raw gateway frame, before dispatch decoding.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayFrame {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    /// Sequence number, present on dispatch frames; echoed in heartbeats.
    #[serde(default)]
    pub s: Option<u64>,
    /// Dispatch event name.
    #[serde(default)]
    pub t: Option<String>,
}

/// Payload of the HELLO frame.
#[derive(Debug, Clone, Deserialize)]
pub struct Hello {
    /// Milliseconds between heartbeats.
    pub heartbeat_interval: u64,
}

/// A Discord user as it appears in gateway payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Snowflake id; arrives as a decimal string on the wire.
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

/// A channel message, from `MESSAGE_CREATE` or `MESSAGE_UPDATE`.
///
/// Update payloads are partial: everything beyond the ids may be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
    /// Users the platform resolved from `<@id>` markup in the content.
    #[serde(default)]
    pub mentions: Vec<User>,
}

impl Message {
    /// Calendar date the message was created on, when the payload
    /// carries a timestamp.
    pub fn created_on(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date_naive())
    }
}

/// Payload of the READY dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyEvent {
    #[serde(rename = "v")]
    pub version: u8,
    /// The bot's own user.
    pub user: User,
    #[serde(default)]
    pub session_id: String,
}

/// Dispatch events the bot reacts to.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(ReadyEvent),
    MessageCreate(Message),
    MessageUpdate(Message),
    InteractionCreate(Interaction),
    /// Any dispatch we do not handle, kept by name for logging.
    Unknown(String),
}

/// Trait for handling Discord events.
///
/// Handlers run off the gateway read loop and may suspend, including on
/// futures resolved by *later* events.
#[async_trait::async_trait]
pub trait DiscordEventHandler: Send + Sync {
    /// Called once the gateway session is ready.
    async fn on_ready(&self, ready: ReadyEvent) -> DiscordResult<()>;

    /// Called for every new channel message.
    async fn on_message(&self, message: Message) -> DiscordResult<()>;

    /// Called when a message is edited.
    async fn on_message_update(&self, message: Message) -> DiscordResult<()>;

    /// Called for slash command invocations.
    async fn on_interaction(&self, interaction: Interaction) -> DiscordResult<()>;
}

/// Parse one gateway frame from its wire text.
pub fn parse_frame(text: &str) -> DiscordResult<GatewayFrame> {
    serde_json::from_str(text)
        .map_err(|e| DiscordError::InvalidPayload(format!("Bad gateway frame: {}", e)))
}

/// Decode a dispatch frame (op 0) into a typed event.
pub fn parse_dispatch(frame: &GatewayFrame) -> DiscordResult<GatewayEvent> {
    let name = frame.t.as_deref().unwrap_or("");
    match name {
        "READY" => Ok(GatewayEvent::Ready(serde_json::from_value(frame.d.clone())?)),
        "MESSAGE_CREATE" => Ok(GatewayEvent::MessageCreate(serde_json::from_value(frame.d.clone())?)),
        "MESSAGE_UPDATE" => Ok(GatewayEvent::MessageUpdate(serde_json::from_value(frame.d.clone())?)),
        "INTERACTION_CREATE" => {
            Ok(GatewayEvent::InteractionCreate(serde_json::from_value(frame.d.clone())?))
        }
        other => {
            debug!("Ignoring dispatch event: {}", other);
            Ok(GatewayEvent::Unknown(other.to_string()))
        }
    }
}

/// Build the identify frame sent after HELLO.
pub fn identify_frame(token: &str, intents: u64) -> Value {
    serde_json::json!({
        "op": op::IDENTIFY,
        "d": {
            "token": token,
            "intents": intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "guesslog",
                "device": "guesslog"
            }
        }
    })
}

/// Build a heartbeat frame echoing the last seen sequence number.
pub fn heartbeat_frame(last_seq: Option<u64>) -> Value {
    serde_json::json!({
        "op": op::HEARTBEAT,
        "d": last_seq
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hello_frame() {
        let text = r#"{"op":10,"d":{"heartbeat_interval":41250},"s":null,"t":null}"#;
        let frame = parse_frame(text).unwrap();
        assert_eq!(frame.op, op::HELLO);

        let hello: Hello = serde_json::from_value(frame.d).unwrap();
        assert_eq!(hello.heartbeat_interval, 41250);
    }

    #[test]
    fn test_parse_frame_tracks_sequence() {
        let text = r#"{"op":0,"d":{},"s":42,"t":"TYPING_START"}"#;
        let frame = parse_frame(text).unwrap();
        assert_eq!(frame.s, Some(42));
        assert_eq!(frame.t.as_deref(), Some("TYPING_START"));
    }

    #[test]
    fn test_parse_frame_rejects_garbage() {
        assert!(parse_frame("not json").is_err());
    }

    #[test]
    fn test_parse_dispatch_ready() {
        let text = r#"{
            "op": 0,
            "s": 1,
            "t": "READY",
            "d": {
                "v": 10,
                "user": {"id": "159985870458322944", "username": "guesslog", "bot": true},
                "session_id": "abc123"
            }
        }"#;
        let frame = parse_frame(text).unwrap();
        let event = parse_dispatch(&frame).unwrap();

        match event {
            GatewayEvent::Ready(ready) => {
                assert_eq!(ready.version, 10);
                assert_eq!(ready.user.username, "guesslog");
                assert!(ready.user.bot);
                assert_eq!(ready.session_id, "abc123");
            }
            _ => panic!("Expected Ready event"),
        }
    }

    #[test]
    fn test_parse_dispatch_message_create() {
        let text = r#"{
            "op": 0,
            "s": 7,
            "t": "MESSAGE_CREATE",
            "d": {
                "id": "1",
                "channel_id": "2",
                "author": {"id": "3", "username": "alice"},
                "content": "Wordle 732 4/6",
                "timestamp": "2023-06-21T14:03:07.000000+00:00",
                "mentions": []
            }
        }"#;
        let frame = parse_frame(text).unwrap();
        let event = parse_dispatch(&frame).unwrap();

        match event {
            GatewayEvent::MessageCreate(message) => {
                assert_eq!(message.content, "Wordle 732 4/6");
                assert_eq!(message.author.as_ref().unwrap().username, "alice");
                assert!(!message.author.as_ref().unwrap().bot);
                assert_eq!(
                    message.created_on(),
                    Some(NaiveDate::from_ymd_opt(2023, 6, 21).unwrap())
                );
            }
            _ => panic!("Expected MessageCreate event"),
        }
    }

    #[test]
    fn test_parse_dispatch_partial_message_update() {
        // Update payloads may omit the author and timestamp entirely.
        let text = r#"{
            "op": 0,
            "s": 8,
            "t": "MESSAGE_UPDATE",
            "d": {"id": "1", "channel_id": "2"}
        }"#;
        let frame = parse_frame(text).unwrap();
        let event = parse_dispatch(&frame).unwrap();

        match event {
            GatewayEvent::MessageUpdate(message) => {
                assert!(message.author.is_none());
                assert!(message.content.is_empty());
                assert_eq!(message.created_on(), None);
            }
            _ => panic!("Expected MessageUpdate event"),
        }
    }

    #[test]
    fn test_parse_dispatch_unknown_event() {
        let text = r#"{"op":0,"s":9,"t":"GUILD_CREATE","d":{"id":"1"}}"#;
        let frame = parse_frame(text).unwrap();
        let event = parse_dispatch(&frame).unwrap();
        assert!(matches!(event, GatewayEvent::Unknown(name) if name == "GUILD_CREATE"));
    }

    #[test]
    fn test_identify_frame_shape() {
        let frame = identify_frame("token123", intents::GUILD_MESSAGES | intents::MESSAGE_CONTENT);
        assert_eq!(frame["op"], 2);
        assert_eq!(frame["d"]["token"], "token123");
        assert_eq!(frame["d"]["intents"], (1u64 << 9) | (1u64 << 15));
        assert_eq!(frame["d"]["properties"]["browser"], "guesslog");
    }

    #[test]
    fn test_heartbeat_frame_with_and_without_sequence() {
        let frame = heartbeat_frame(Some(42));
        assert_eq!(frame["op"], 1);
        assert_eq!(frame["d"], 42);

        let frame = heartbeat_frame(None);
        assert!(frame["d"].is_null());
    }
}
