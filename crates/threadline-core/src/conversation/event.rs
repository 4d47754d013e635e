//! Typed change-feed events.

use serde::{Deserialize, Serialize};

use super::Conversation;

/// A row-level change to the conversation list.
///
/// Events arrive from two independent producers: the realtime adapter
/// (reflecting the server's last-committed view) and local optimistic echoes
/// (creation, deletion). Both flow through [`ConversationRegistry::apply`],
/// which is the single reconciliation point.
///
/// [`ConversationRegistry::apply`]: super::ConversationRegistry::apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// A conversation row appeared.
    Insert(Conversation),
    /// An existing row changed (title rename, activity bump).
    Update(Conversation),
    /// A row was removed.
    Delete { id: String },
}

impl ChangeEvent {
    /// The id of the conversation this event concerns.
    pub fn conversation_id(&self) -> &str {
        match self {
            Self::Insert(row) | Self::Update(row) => &row.id,
            Self::Delete { id } => id,
        }
    }
}
