//! Outbound message formatting types.

use serde::{Deserialize, Serialize};

/// A rich embed attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Accent color as `0xRRGGBB`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fields: Vec<EmbedField>,
}

/// One name/value field inside an embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

impl Embed {
    /// Create an empty embed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the accent color.
    pub fn with_color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    /// Append a full-width field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_builder() {
        let embed = Embed::new()
            .with_title("🏆 Wordle Leaderboard")
            .with_color(0x00ff00)
            .field("#1 alice", "Avg: 3.20 | Games: 5");

        assert_eq!(embed.title.as_deref(), Some("🏆 Wordle Leaderboard"));
        assert_eq!(embed.color, Some(0x00ff00));
        assert_eq!(embed.fields.len(), 1);
        assert!(!embed.fields[0].inline);
    }

    #[test]
    fn test_embed_serialization_skips_empty_fields() {
        let embed = Embed::new().with_title("title");
        let json = serde_json::to_string(&embed).unwrap();
        assert_eq!(json, r#"{"title":"title"}"#);
    }

    #[test]
    fn test_embed_field_order_preserved() {
        let embed = Embed::new().field("#1 a", "first").field("#2 b", "second");
        assert_eq!(embed.fields[0].name, "#1 a");
        assert_eq!(embed.fields[1].name, "#2 b");
    }
}
