//! Configuration for the Discord connection.

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::error::{DiscordError, DiscordResult};

/// Configuration for the Discord bot.
///
/// One bot token authorizes both the gateway session and the REST API.
#[derive(Clone)]
pub struct DiscordConfig {
    /// Bot token from the developer portal.
    bot_token: SecretString,
    /// Application id owning the slash commands.
    application_id: u64,
    /// Optional guild for instant command registration; global commands
    /// can take up to an hour to propagate.
    guild_id: Option<u64>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &"[REDACTED]")
            .field("application_id", &self.application_id)
            .field("guild_id", &self.guild_id)
            .finish()
    }
}

impl DiscordConfig {
    /// Create a new configuration.
    pub fn new(bot_token: impl Into<String>, application_id: u64) -> Self {
        Self {
            bot_token: SecretString::from(bot_token.into()),
            application_id,
            guild_id: None,
        }
    }

    /// Also register commands to this guild for instant availability.
    pub fn with_guild(mut self, guild_id: u64) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Requires `DISCORD_BOT_TOKEN` and `DISCORD_APPLICATION_ID`;
    /// `DISCORD_GUILD_ID` is optional.
    pub fn from_env() -> DiscordResult<Self> {
        let bot_token = std::env::var("DISCORD_BOT_TOKEN")
            .map_err(|_| DiscordError::Config("DISCORD_BOT_TOKEN not set".to_string()))?;

        let application_id = std::env::var("DISCORD_APPLICATION_ID")
            .map_err(|_| DiscordError::Config("DISCORD_APPLICATION_ID not set".to_string()))?
            .parse()
            .map_err(|_| {
                DiscordError::Config("DISCORD_APPLICATION_ID must be a numeric id".to_string())
            })?;

        let mut config = Self::new(bot_token, application_id);

        if let Ok(guild) = std::env::var("DISCORD_GUILD_ID") {
            let guild_id = guild.parse().map_err(|_| {
                DiscordError::Config("DISCORD_GUILD_ID must be a numeric id".to_string())
            })?;
            config = config.with_guild(guild_id);
        }

        config.validate()?;
        Ok(config)
    }

    /// The bot token.
    pub fn bot_token(&self) -> &str {
        self.bot_token.expose_secret()
    }

    /// The application id.
    pub fn application_id(&self) -> u64 {
        self.application_id
    }

    /// The guild for instant command registration, if configured.
    pub fn guild_id(&self) -> Option<u64> {
        self.guild_id
    }

    /// Validate the configuration.
    pub fn validate(&self) -> DiscordResult<()> {
        if self.bot_token.expose_secret().is_empty() {
            return Err(DiscordError::Config("Bot token is empty".to_string()));
        }
        // Bot tokens are three dot-separated base64 sections.
        if !self.bot_token.expose_secret().contains('.') {
            warn!("Bot token does not look like a Discord bot token");
        }
        if self.application_id == 0 {
            return Err(DiscordError::Config("Application id is zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DiscordConfig {
        DiscordConfig::new("MTIz.fake.token", 1234567890)
    }

    #[test]
    fn test_valid_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_empty_token_rejected() {
        let config = DiscordConfig::new("", 1234567890);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_application_id_rejected() {
        let config = DiscordConfig::new("MTIz.fake.token", 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_guild() {
        let config = test_config().with_guild(42);
        assert_eq!(config.guild_id(), Some(42));
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", test_config());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("MTIz"));
    }
}
