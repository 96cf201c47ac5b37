use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a [`ConversationRecord`]. Distinct from [`crate::tool::Role`],
/// which additionally carries a `Tool` variant used only on the wire to
/// providers — the conversation log itself never stores tool-role entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvRole {
    System,
    User,
    Assistant,
}

/// One entry in the append-only turn log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub role: ConvRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Eligible for compression once it ages past the detail window.
    #[serde(default)]
    pub should_summarize: bool,
    /// Whether it has already been compressed.
    #[serde(default)]
    pub summarized: bool,
    /// Identifies the lead record that is never dropped.
    #[serde(default)]
    pub is_system_prompt: bool,
    /// Hint to providers that support explicit cache checkpoints.
    #[serde(default)]
    pub should_cache: bool,
    /// True if the record must be purged before the next model call and
    /// re-materialized fresh (the HUD).
    #[serde(default)]
    pub ephemeral: bool,
}

impl ConversationRecord {
    pub fn system_prompt(content: impl Into<String>) -> Self {
        Self {
            role: ConvRole::System,
            content: content.into(),
            timestamp: Utc::now(),
            should_summarize: false,
            summarized: false,
            is_system_prompt: true,
            should_cache: true,
            ephemeral: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ConvRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            should_summarize: true,
            summarized: false,
            is_system_prompt: false,
            should_cache: false,
            ephemeral: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ConvRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            should_summarize: true,
            summarized: false,
            is_system_prompt: false,
            should_cache: false,
            ephemeral: false,
        }
    }

    /// The synthetic marker inserted by windowing trims. Never eligible for
    /// further summarization.
    pub fn truncation_marker() -> Self {
        Self {
            role: ConvRole::User,
            content: "[Some conversation history has been truncated for brevity]".to_string(),
            timestamp: Utc::now(),
            should_summarize: false,
            summarized: false,
            is_system_prompt: false,
            should_cache: false,
            ephemeral: false,
        }
    }

    pub fn ephemeral_hud(content: impl Into<String>) -> Self {
        Self {
            role: ConvRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            should_summarize: false,
            summarized: false,
            is_system_prompt: false,
            should_cache: false,
            ephemeral: true,
        }
    }
}
