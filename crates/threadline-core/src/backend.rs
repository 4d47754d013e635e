//! Backend service traits.
//!
//! These traits decouple the controllers from the HTTP transport, so
//! pipelines and coordinators are testable against in-memory fakes (the
//! `threadline-backend` crate provides the reqwest implementations).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::Conversation;
use crate::error::Result;
use crate::message::{Message, MessageRole};
use crate::model_catalog::ModelOption;

/// One turn of completion history, as sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionTurn {
    pub role: MessageRole,
    pub content: String,
}

impl From<&Message> for CompletionTurn {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// A completion request for one exchange.
///
/// `history` is the ordered prior non-system history of a single conversation
/// plus the new user message; it never includes the placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub user_id: String,
    pub model: Option<String>,
    pub history: Vec<CompletionTurn>,
}

/// Parameters for creating one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateConversationRequest {
    pub user_id: String,
    pub title: String,
    pub model: Option<String>,
}

/// The profile row upserted by the username bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// The chat backend consumed by the controllers.
///
/// All operations are best-effort from the controller's point of view: the
/// optimistic local state stays authoritative for the current session, and
/// callers decide per call site whether a failure is surfaced or only logged.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Lists the conversation summaries owned by an identity.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>>;

    /// Creates one conversation and returns the persisted summary.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the response carries no id; callers
    /// must not send messages against a conversation that was not created.
    async fn create_conversation(&self, request: CreateConversationRequest)
        -> Result<Conversation>;

    /// Persists one message. Writes are idempotent upserts.
    async fn save_message(&self, message: &Message, user_id: &str) -> Result<()>;

    /// Requests a completion and returns the extracted reply text.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Fetches the persisted messages of one conversation, in order.
    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;

    /// Deletes one conversation.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;

    /// Fetches the read-only model catalog.
    async fn list_models(&self) -> Result<Vec<ModelOption>>;
}

/// Profile persistence with a uniqueness constraint on `username`.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Upserts the profile row keyed by identity id.
    ///
    /// # Errors
    ///
    /// A username collision is reported as [`ThreadlineError::Conflict`];
    /// any other failure is not worth retrying.
    ///
    /// [`ThreadlineError::Conflict`]: crate::error::ThreadlineError::Conflict
    async fn upsert_profile(&self, profile: &ProfileRow) -> Result<()>;
}
