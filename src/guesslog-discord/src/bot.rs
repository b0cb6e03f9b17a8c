//! Main Discord bot implementation: gateway session plus REST client.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use crate::commands::{CommandSpec, InteractionResponse, InteractionResponseData};
use crate::config::DiscordConfig;
use crate::error::{DiscordError, DiscordResult};
use crate::events::{self, DiscordEventHandler, GatewayEvent, GatewayFrame, Hello, Message, User, intents, op};

/// Type alias for the WebSocket connection.
type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// REST API base.
const API_BASE: &str = "https://discord.com/api/v10";

/// Discord requires a `DiscordBot (url, version)` user agent on REST calls.
const USER_AGENT: &str = concat!("DiscordBot (https://github.com/guesslog/guesslog, ", env!("CARGO_PKG_VERSION"), ")");

/// Configuration for bot behavior.
#[derive(Debug, Clone)]
pub struct BotOptions {
    /// Timeout for REST API calls.
    pub api_timeout: Duration,
    /// Delay between gateway reconnection attempts.
    pub reconnect_delay: Duration,
    /// Gateway intents to identify with.
    pub intents: u64,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            api_timeout: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            intents: intents::GUILD_MESSAGES | intents::MESSAGE_CONTENT,
        }
    }
}

/// Narrow outbound seam for replying to interactions.
///
/// The event handler talks back to Discord through this trait so tests
/// can substitute a recording double for the live client.
#[async_trait::async_trait]
pub trait InteractionResponder: Send + Sync {
    /// Send the initial response to an interaction.
    async fn respond(
        &self,
        interaction_id: &str,
        token: &str,
        response: &InteractionResponse,
    ) -> DiscordResult<()>;

    /// Send a followup message after a response or deferral.
    async fn followup(&self, token: &str, message: &InteractionResponseData) -> DiscordResult<()>;
}

/// Gateway connection metadata from `GET /gateway/bot`.
#[derive(Debug, Deserialize)]
struct GatewayInfo {
    url: String,
}

/// The Discord bot.
pub struct DiscordBot {
    config: DiscordConfig,
    client: reqwest::Client,
    options: BotOptions,
    /// Our own user id, learned from auth; used to drop our own traffic.
    bot_user_id: Arc<RwLock<Option<String>>>,
    shutdown_tx: broadcast::Sender<()>,
    event_handler: Arc<RwLock<Option<Arc<dyn DiscordEventHandler>>>>,
}

impl DiscordBot {
    /// Create a new bot with default options.
    pub async fn new(config: DiscordConfig) -> DiscordResult<Self> {
        Self::with_options(config, BotOptions::default()).await
    }

    /// Create a new bot with custom options.
    pub async fn with_options(config: DiscordConfig, options: BotOptions) -> DiscordResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(options.api_timeout)
            .build()
            .map_err(|e| DiscordError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            client,
            options,
            bot_user_id: Arc::new(RwLock::new(None)),
            shutdown_tx,
            event_handler: Arc::new(RwLock::new(None)),
        })
    }

    /// Install the event handler. Must be called before [`start`](Self::start).
    pub async fn set_event_handler(&self, handler: Arc<dyn DiscordEventHandler>) {
        let mut guard = self.event_handler.write().await;
        *guard = Some(handler);
    }

    async fn handler(&self) -> Option<Arc<dyn DiscordEventHandler>> {
        self.event_handler.read().await.clone()
    }

    /// Start the bot: validate credentials, then run the gateway session
    /// until shutdown.
    pub async fn start(&self) -> DiscordResult<()> {
        info!("Starting Discord bot...");
        self.test_auth().await?;
        self.run_gateway().await
    }

    /// Signal the bot to shut down.
    pub fn shutdown(&self) {
        info!("Shutting down Discord bot...");
        let _ = self.shutdown_tx.send(());
    }

    /// Gateway session loop with reconnection.
    async fn run_gateway(&self) -> DiscordResult<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            match self.get_gateway_url().await {
                Ok(url) => {
                    info!("Connecting to Discord gateway...");
                    match self.connect_and_run(&url, &mut shutdown_rx).await {
                        Ok(()) => {
                            info!("Gateway connection closed gracefully");
                            break;
                        }
                        Err(e) => {
                            error!("Gateway connection error: {}", e);
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to get gateway URL: {}", e);
                }
            }

            if shutdown_rx.try_recv().is_ok() {
                info!("Shutdown requested");
                break;
            }

            info!("Reconnecting in {:?}...", self.options.reconnect_delay);
            tokio::time::sleep(self.options.reconnect_delay).await;
        }

        Ok(())
    }

    /// Open one gateway connection and pump it until it dies or we shut
    /// down.
    async fn connect_and_run(
        &self,
        url: &str,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> DiscordResult<()> {
        let (ws_stream, _) = connect_async(url).await?;
        info!("Gateway WebSocket connected");

        let (mut write, mut read) = ws_stream.split();

        // All outbound frames funnel through one writer task.
        let (msg_tx, mut msg_rx) = mpsc::channel::<WsMessage>(100);
        let write_task = tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                if let Err(e) = write.send(msg).await {
                    error!("Failed to send gateway frame: {}", e);
                    break;
                }
            }
        });

        // The server speaks first: HELLO carries the heartbeat interval.
        let hello = wait_for_hello(&mut read).await?;
        debug!(interval_ms = hello.heartbeat_interval, "Gateway session opened");

        let last_seq: Arc<RwLock<Option<u64>>> = Arc::new(RwLock::new(None));

        let heartbeat_tx = msg_tx.clone();
        let heartbeat_seq = last_seq.clone();
        let heartbeat_interval = Duration::from_millis(hello.heartbeat_interval);
        let heartbeat_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(heartbeat_interval);
            // The immediate first tick would race the identify; skip it.
            interval.tick().await;
            loop {
                interval.tick().await;
                let seq = *heartbeat_seq.read().await;
                let Ok(text) = serde_json::to_string(&events::heartbeat_frame(seq)) else {
                    break;
                };
                if heartbeat_tx.send(WsMessage::Text(text)).await.is_err() {
                    break;
                }
            }
        });

        let identify = events::identify_frame(self.config.bot_token(), self.options.intents);
        msg_tx
            .send(WsMessage::Text(serde_json::to_string(&identify)?))
            .await
            .map_err(|_| DiscordError::WebSocket("Writer task closed".to_string()))?;
        debug!("Identify sent, awaiting session");

        let result = self.process_messages(read, msg_tx, shutdown_rx, last_seq).await;

        write_task.abort();
        heartbeat_task.abort();

        result
    }

    /// Main frame processing loop.
    async fn process_messages(
        &self,
        mut read: SplitStream<WsConnection>,
        msg_tx: mpsc::Sender<WsMessage>,
        shutdown_rx: &mut broadcast::Receiver<()>,
        last_seq: Arc<RwLock<Option<u64>>>,
    ) -> DiscordResult<()> {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    let _ = msg_tx.send(WsMessage::Close(None)).await;
                    return Ok(());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            self.handle_gateway_message(&text, &msg_tx, &last_seq).await?;
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            let _ = msg_tx.send(WsMessage::Pong(data)).await;
                        }
                        Some(Ok(WsMessage::Pong(_))) => {
                            debug!("Received pong");
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            // Server-side closes are not graceful ends for
                            // us; the session should come back.
                            return Err(DiscordError::Gateway(format!(
                                "Closed by server: {:?}",
                                frame
                            )));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(e.into());
                        }
                        None => {
                            return Err(DiscordError::Gateway("Stream ended".to_string()));
                        }
                    }
                }
            }
        }
    }

    /// Handle one text frame from the gateway.
    ///
    /// Returns an error only when the connection must be torn down and
    /// re-established; malformed payloads are logged and skipped.
    async fn handle_gateway_message(
        &self,
        text: &str,
        msg_tx: &mpsc::Sender<WsMessage>,
        last_seq: &Arc<RwLock<Option<u64>>>,
    ) -> DiscordResult<()> {
        let frame = match events::parse_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to parse gateway frame: {}", e);
                return Ok(());
            }
        };

        if let Some(seq) = frame.s {
            let mut guard = last_seq.write().await;
            *guard = Some(seq);
        }

        match frame.op {
            op::DISPATCH => {
                self.handle_dispatch(frame).await;
                Ok(())
            }
            op::HEARTBEAT => {
                // The server may request an immediate heartbeat.
                let seq = *last_seq.read().await;
                let text = serde_json::to_string(&events::heartbeat_frame(seq))?;
                let _ = msg_tx.send(WsMessage::Text(text)).await;
                Ok(())
            }
            op::HEARTBEAT_ACK => {
                debug!("Heartbeat acknowledged");
                Ok(())
            }
            op::RECONNECT => Err(DiscordError::Gateway("Server requested reconnect".to_string())),
            op::INVALID_SESSION => {
                Err(DiscordError::Gateway("Session invalidated by server".to_string()))
            }
            other => {
                debug!("Unhandled gateway op: {}", other);
                Ok(())
            }
        }
    }

    /// Route one dispatch event to the installed handler.
    ///
    /// Handlers run in their own task: a handler may legitimately wait
    /// for a later message (the reset confirmation does), so dispatch
    /// must never block the read loop.
    async fn handle_dispatch(&self, frame: GatewayFrame) {
        let event = match events::parse_dispatch(&frame) {
            Ok(event) => event,
            Err(e) => {
                warn!(event = frame.t.as_deref().unwrap_or(""), "Failed to decode dispatch: {}", e);
                return;
            }
        };

        match event {
            GatewayEvent::Ready(ready) => {
                info!(user = %ready.user.username, id = %ready.user.id, "Gateway session ready");
                {
                    let mut guard = self.bot_user_id.write().await;
                    *guard = Some(ready.user.id.clone());
                }
                if let Some(handler) = self.handler().await {
                    tokio::spawn(async move {
                        if let Err(e) = handler.on_ready(ready).await {
                            error!("Ready handler error: {}", e);
                        }
                    });
                }
            }
            GatewayEvent::MessageCreate(message) => {
                if self.is_own_message(&message).await {
                    return;
                }
                if let Some(handler) = self.handler().await {
                    tokio::spawn(async move {
                        if let Err(e) = handler.on_message(message).await {
                            error!("Message handler error: {}", e);
                        }
                    });
                }
            }
            GatewayEvent::MessageUpdate(message) => {
                if self.is_own_message(&message).await {
                    return;
                }
                if let Some(handler) = self.handler().await {
                    tokio::spawn(async move {
                        if let Err(e) = handler.on_message_update(message).await {
                            error!("Message update handler error: {}", e);
                        }
                    });
                }
            }
            GatewayEvent::InteractionCreate(interaction) => {
                if let Some(handler) = self.handler().await {
                    tokio::spawn(async move {
                        if let Err(e) = handler.on_interaction(interaction).await {
                            error!("Interaction handler error: {}", e);
                        }
                    });
                }
            }
            GatewayEvent::Unknown(_) => {}
        }
    }

    /// Whether a message was authored by this bot itself. Other bots'
    /// messages pass through; the daily digest is posted by one.
    async fn is_own_message(&self, message: &Message) -> bool {
        let own_id = self.bot_user_id.read().await;
        match (own_id.as_deref(), message.author.as_ref()) {
            (Some(own), Some(author)) => author.id == own,
            _ => false,
        }
    }

    /// Make an authorized REST call, mapping rate limits and API errors.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> DiscordResult<reqwest::Response> {
        let url = format!("{}{}", API_BASE, path);
        debug!("Discord API call: {} {}", method, path);

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.config.bot_token()))
            .header("User-Agent", USER_AGENT);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        if response.status().as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok())
                .map(|secs| secs.ceil() as u64)
                .unwrap_or(5);
            warn!("Rate limited by Discord API, retry after {}s", retry_after);
            return Err(DiscordError::RateLimited { retry_after_secs: retry_after });
        }

        if response.status().as_u16() == 401 {
            return Err(DiscordError::Auth("Bot token rejected".to_string()));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DiscordError::Api(format!("{}: {}", status, body)));
        }

        Ok(response)
    }

    /// Validate the bot token and learn our own user id.
    async fn test_auth(&self) -> DiscordResult<()> {
        debug!("Validating Discord credentials...");
        let me: User = self.request(Method::GET, "/users/@me", None).await?.json().await?;

        info!(user = %me.username, id = %me.id, "Authenticated as bot user");
        let mut guard = self.bot_user_id.write().await;
        *guard = Some(me.id);
        Ok(())
    }

    /// Fetch the WebSocket URL for the gateway session.
    async fn get_gateway_url(&self) -> DiscordResult<String> {
        let info: GatewayInfo = self.request(Method::GET, "/gateway/bot", None).await?.json().await?;
        Ok(format!("{}/?v=10&encoding=json", info.url.trim_end_matches('/')))
    }

    /// Register the slash commands, globally and (when configured) to a
    /// guild where they become available immediately.
    pub async fn register_commands(&self, commands: &[CommandSpec]) -> DiscordResult<()> {
        let body = serde_json::to_value(commands)?;

        let global_path = format!("/applications/{}/commands", self.config.application_id());
        self.request(Method::PUT, &global_path, Some(&body)).await?;
        info!(count = commands.len(), "Registered global application commands");

        if let Some(guild_id) = self.config.guild_id() {
            let guild_path = format!(
                "/applications/{}/guilds/{}/commands",
                self.config.application_id(),
                guild_id
            );
            self.request(Method::PUT, &guild_path, Some(&body)).await?;
            info!(guild = guild_id, "Registered guild application commands");
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl InteractionResponder for DiscordBot {
    async fn respond(
        &self,
        interaction_id: &str,
        token: &str,
        response: &InteractionResponse,
    ) -> DiscordResult<()> {
        let path = format!("/interactions/{}/{}/callback", interaction_id, token);
        let body = serde_json::to_value(response)?;
        self.request(Method::POST, &path, Some(&body)).await?;
        Ok(())
    }

    async fn followup(&self, token: &str, message: &InteractionResponseData) -> DiscordResult<()> {
        let path = format!("/webhooks/{}/{}", self.config.application_id(), token);
        let body = serde_json::to_value(message)?;
        self.request(Method::POST, &path, Some(&body)).await?;
        Ok(())
    }
}

/// Wait for the opening HELLO frame on a fresh connection.
async fn wait_for_hello(read: &mut SplitStream<WsConnection>) -> DiscordResult<Hello> {
    match read.next().await {
        Some(Ok(WsMessage::Text(text))) => {
            let frame = events::parse_frame(&text)?;
            if frame.op != op::HELLO {
                return Err(DiscordError::Gateway(format!("Expected HELLO, got op {}", frame.op)));
            }
            Ok(serde_json::from_value(frame.d)?)
        }
        Some(Ok(other)) => {
            Err(DiscordError::Gateway(format!("Expected HELLO text frame, got {:?}", other)))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(DiscordError::Gateway("Connection closed before HELLO".to_string())),
    }
}
