//! Event handling: score extraction, persistence, and slash commands.

use std::sync::Arc;

use async_trait::async_trait;
use guesslog_discord::bot::InteractionResponder;
use guesslog_discord::commands::{
    CommandSpec, INTERACTION_TYPE_APPLICATION_COMMAND, Interaction, InteractionResponse,
    InteractionResponseData, ParsedCommand, parse_command,
};
use guesslog_discord::error::DiscordResult;
use guesslog_discord::events::{DiscordEventHandler, Message, ReadyEvent};
use guesslog_discord::messages::Embed;
use guesslog_score::{Mention, MessageView, extract};
use guesslog_store::{LeaderboardEntry, RecordOutcome, ScoreStore, record_batch};
use tracing::{debug, error, info, warn};

use crate::confirm::{CONFIRMATION_WINDOW, ConfirmationGate};

/// Rows shown on the leaderboard.
const LEADERBOARD_LIMIT: i64 = 10;

/// Leaderboard embed accent (green).
const LEADERBOARD_COLOR: u32 = 0x00ff00;

/// The slash commands this bot registers.
pub fn command_specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("leaderboard", "Show Wordle leaderboard"),
        CommandSpec::new("resetleaderboard", "Reset the Wordle leaderboard"),
    ]
}

/// Routes Discord events into score extraction and the two slash
/// commands.
pub struct ScoreHandler {
    store: Arc<dyn ScoreStore>,
    responder: Arc<dyn InteractionResponder>,
    gate: Arc<ConfirmationGate>,
}

impl ScoreHandler {
    pub fn new(
        store: Arc<dyn ScoreStore>,
        responder: Arc<dyn InteractionResponder>,
        gate: Arc<ConfirmationGate>,
    ) -> Self {
        Self { store, responder, gate }
    }

    /// Run the extraction pipeline over one message and persist whatever
    /// it yields.
    async fn record_scores(&self, message: &Message) {
        let Some(author) = message.author.as_ref() else {
            return;
        };
        let Some(created_on) = message.created_on() else {
            return;
        };

        let mentions: Vec<Mention> = message
            .mentions
            .iter()
            .filter_map(|user| {
                user.id.parse().ok().map(|id| Mention { id, name: user.username.clone() })
            })
            .collect();

        let view = MessageView {
            author_id: author.id.parse().ok(),
            author_name: &author.username,
            content: &message.content,
            created_on,
            mentions: &mentions,
        };

        let records = extract(&view);
        if records.is_empty() {
            return;
        }

        let outcomes = record_batch(self.store.as_ref(), &records).await;
        let stored = outcomes.iter().filter(|o| matches!(o, RecordOutcome::Stored { .. })).count();
        let skipped = outcomes.iter().filter(|o| matches!(o, RecordOutcome::Skipped { .. })).count();
        let failed = outcomes.len() - stored - skipped;
        info!(stored, skipped, failed, "Processed score message");
    }

    async fn handle_leaderboard(&self, interaction: &Interaction) -> DiscordResult<()> {
        // The aggregate can be slow on a cold pool; acknowledge first.
        self.responder
            .respond(&interaction.id, &interaction.token, &InteractionResponse::deferred())
            .await?;

        match self.store.leaderboard(LEADERBOARD_LIMIT).await {
            Ok(entries) => {
                let message = InteractionResponseData::default().with_embed(leaderboard_embed(&entries));
                self.responder.followup(&interaction.token, &message).await
            }
            Err(e) => {
                error!("Leaderboard query failed: {}", e);
                let message =
                    InteractionResponseData::default().with_content("Error generating leaderboard.");
                self.responder.followup(&interaction.token, &message).await
            }
        }
    }

    async fn handle_reset(&self, interaction: &Interaction) -> DiscordResult<()> {
        if !interaction.invoker_is_admin() {
            let response = InteractionResponse::channel_message(
                "❌ You don't have permission to do that.",
            )
            .ephemeral();
            return self.responder.respond(&interaction.id, &interaction.token, &response).await;
        }

        let Some(user_id) = interaction.invoker().and_then(|user| user.id.parse::<u64>().ok())
        else {
            warn!("Reset command without a resolvable invoker");
            return Ok(());
        };

        // Arm before prompting so an instant reply cannot slip past.
        let intent = self.gate.arm(user_id).await;
        let prompt = InteractionResponse::channel_message("⚠️ Type `yes` within 30s to confirm reset.");
        self.responder.respond(&interaction.id, &interaction.token, &prompt).await?;

        if !intent.confirmed_within(CONFIRMATION_WINDOW).await {
            info!(user = user_id, "Reset not confirmed");
            let message = InteractionResponseData::default().with_content("❌ Reset cancelled.");
            return self.responder.followup(&interaction.token, &message).await;
        }

        match self.store.reset().await {
            Ok(deleted) => {
                info!(user = user_id, rows = deleted, "Leaderboard reset");
                let message = InteractionResponseData::default().with_content("✅ Leaderboard reset.");
                self.responder.followup(&interaction.token, &message).await
            }
            Err(e) => {
                error!("Reset failed: {}", e);
                let message = InteractionResponseData::default().with_content("❌ Reset failed.");
                self.responder.followup(&interaction.token, &message).await
            }
        }
    }
}

#[async_trait]
impl DiscordEventHandler for ScoreHandler {
    async fn on_ready(&self, ready: ReadyEvent) -> DiscordResult<()> {
        info!(user = %ready.user.username, id = %ready.user.id, "Logged in");
        Ok(())
    }

    async fn on_message(&self, message: Message) -> DiscordResult<()> {
        // A pending reset may be waiting for this author's reply.
        if let Some(author) = message.author.as_ref()
            && let Ok(user_id) = author.id.parse::<u64>()
            && self.gate.confirm(user_id, &message.content).await
        {
            debug!(user = user_id, "Confirmation received");
        }

        self.record_scores(&message).await;
        Ok(())
    }

    async fn on_message_update(&self, message: Message) -> DiscordResult<()> {
        // Partial updates without content (embed unfurls and the like)
        // carry nothing scorable.
        if message.content.is_empty() {
            return Ok(());
        }
        debug!(edited_at = ?message.edited_timestamp, "Reprocessing edited message");

        // Re-running the whole pipeline is safe: duplicates collapse on
        // the (username, wordle_number) key.
        self.record_scores(&message).await;
        Ok(())
    }

    async fn on_interaction(&self, interaction: Interaction) -> DiscordResult<()> {
        if interaction.kind != INTERACTION_TYPE_APPLICATION_COMMAND {
            return Ok(());
        }

        match parse_command(&interaction) {
            ParsedCommand::Leaderboard => self.handle_leaderboard(&interaction).await,
            ParsedCommand::ResetLeaderboard => self.handle_reset(&interaction).await,
            ParsedCommand::Unknown(name) => {
                warn!(command = %name, "Unknown command invocation");
                Ok(())
            }
        }
    }
}

/// Render ranked entries as the leaderboard embed.
fn leaderboard_embed(entries: &[LeaderboardEntry]) -> Embed {
    let mut embed = Embed::new().with_title("🏆 Wordle Leaderboard").with_color(LEADERBOARD_COLOR);
    if entries.is_empty() {
        embed = embed.with_description("No scores recorded yet.");
    }
    for (idx, entry) in entries.iter().enumerate() {
        embed = embed.field(
            format!("#{} {}", idx + 1, entry.username),
            format!("Avg: {:.2} | Games: {}", entry.avg_attempts, entry.games_played),
        );
    }
    embed
}
