//! Conversation message types.
//!
//! Messages are append-only from the controller's perspective: a message is
//! never deleted, and its content is overwritten at most once (placeholder to
//! final content, or placeholder to error text).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Represents the role of a message in a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
    /// System-generated message.
    System,
}

/// A single message in a conversation.
///
/// Each message is bound to exactly one conversation and carries the model it
/// was produced with (assistant) or addressed to (user), plus an RFC 3339
/// creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier (UUID format)
    pub id: String,
    /// The conversation this message belongs to
    pub conversation_id: String,
    /// The role of the message sender
    pub role: MessageRole,
    /// The content of the message; empty while a placeholder awaits resolution
    pub content: String,
    /// The model selected for this exchange, if any
    #[serde(default)]
    pub model_used: Option<String>,
    /// Timestamp when the message was created (RFC 3339 format)
    pub created_at: String,
}

impl Message {
    /// Creates a user message bound to `conversation_id`.
    pub fn user(
        conversation_id: impl Into<String>,
        content: impl Into<String>,
        model_used: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            role: MessageRole::User,
            content: content.into(),
            model_used,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Creates an empty assistant placeholder awaiting resolution.
    ///
    /// At most one placeholder exists per conversation at any time; the
    /// exchange pipeline creates and resolves it within a single exchange.
    pub fn placeholder(conversation_id: impl Into<String>, model_used: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            role: MessageRole::Assistant,
            content: String::new(),
            model_used,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether this message is an unresolved assistant placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.role == MessageRole::Assistant && self.content.is_empty()
    }
}
