//! Error types for Discord integration.

use thiserror::Error;

/// Discord integration error types.
#[derive(Debug, Error)]
pub enum DiscordError {
    /// Configuration errors (missing tokens, invalid settings).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication failed against the REST API.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The REST API rejected a request.
    #[error("API error: {0}")]
    Api(String),

    /// Rate limited by the REST API.
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network and transport errors.
    #[error("Network error: {0}")]
    Network(String),

    /// WebSocket transport failure.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Gateway protocol violation or server-directed reconnect.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(String),

    /// An operation timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A payload arrived in a shape we cannot use.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for Discord operations.
pub type DiscordResult<T> = Result<T, DiscordError>;

impl From<reqwest::Error> for DiscordError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DiscordError::Timeout(err.to_string())
        } else if err.is_connect() {
            DiscordError::Network(format!("Connection failed: {}", err))
        } else {
            DiscordError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DiscordError {
    fn from(err: serde_json::Error) -> Self {
        DiscordError::Json(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for DiscordError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        DiscordError::WebSocket(err.to_string())
    }
}

impl From<std::env::VarError> for DiscordError {
    fn from(err: std::env::VarError) -> Self {
        DiscordError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DiscordError::Config("DISCORD_BOT_TOKEN not set".to_string());
        assert_eq!(err.to_string(), "Configuration error: DISCORD_BOT_TOKEN not set");

        let err = DiscordError::RateLimited { retry_after_secs: 30 };
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");

        let err = DiscordError::Gateway("Server requested reconnect".to_string());
        assert_eq!(err.to_string(), "Gateway error: Server requested reconnect");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: DiscordError = json_err.into();
        assert!(matches!(err, DiscordError::Json(_)));
    }

    #[test]
    fn test_from_env_var_error() {
        let err: DiscordError = std::env::VarError::NotPresent.into();
        assert!(matches!(err, DiscordError::Config(_)));
    }
}
