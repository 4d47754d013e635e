//! Conversation creation and deletion.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use threadline_core::Result;
use threadline_core::backend::{ChatBackend, CreateConversationRequest};
use threadline_core::conversation::{ChangeEvent, Conversation};
use threadline_core::identity::Identity;

use crate::registry_service::RegistryService;
use crate::view::{Location, ViewState};

/// Title used when a thread is started without one.
pub const NEW_THREAD_TITLE: &str = "New Thread";

/// Turns a "start a new thread" intent into a durable conversation id,
/// exactly once per intent.
///
/// On success the new summary lands at the head of the registry (as a local
/// insert echo), the pipeline is bound to the id, and the displayed location
/// is updated silently - the exchange surface is never remounted by creation.
pub struct ConversationCoordinator {
    backend: Arc<dyn ChatBackend>,
    registry: Arc<RegistryService>,
    view: Arc<ViewState>,
    identity: Identity,
    default_model: Option<String>,
    // Serializes creation intents from one surface so a rapid double trigger
    // cannot persist two conversations.
    creating: Mutex<()>,
}

impl ConversationCoordinator {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        registry: Arc<RegistryService>,
        view: Arc<ViewState>,
        identity: Identity,
    ) -> Self {
        Self {
            backend,
            registry,
            view,
            identity,
            default_model: None,
            creating: Mutex::new(()),
        }
    }

    /// Sets the model id stamped on creation requests.
    pub fn with_default_model(mut self, model: Option<String>) -> Self {
        self.default_model = model;
        self
    }

    /// Creates one conversation and makes it the active one.
    ///
    /// # Errors
    ///
    /// Fails when the backend request fails or returns no id; in that case
    /// nothing is inserted, nothing is bound, and the caller must not send
    /// messages.
    pub async fn create_conversation(&self, title: &str) -> Result<Conversation> {
        let _intent = self.creating.lock().await;

        let title = title.trim();
        let request = CreateConversationRequest {
            user_id: self.identity.id.clone(),
            title: if title.is_empty() {
                NEW_THREAD_TITLE.to_string()
            } else {
                title.to_string()
            },
            model: self.default_model.clone(),
        };

        let conversation = self.backend.create_conversation(request).await?;
        debug!(conversation_id = %conversation.id, "conversation created");

        self.registry
            .apply(ChangeEvent::Insert(conversation.clone()))
            .await;
        self.view.bind(&conversation.id);
        self.view
            .set_location(Location::Conversation(conversation.id.clone()));

        Ok(conversation)
    }

    /// Deletes one conversation.
    ///
    /// On success the id leaves the registry; if it was the bound
    /// conversation, the binding is cleared and the surface navigates to the
    /// neutral location. On failure the registry is left untouched and no
    /// retry is attempted.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        if let Err(err) = self.backend.delete_conversation(conversation_id).await {
            warn!(conversation_id, error = %err, "conversation delete failed");
            return Err(err);
        }

        self.registry
            .apply(ChangeEvent::Delete {
                id: conversation_id.to_string(),
            })
            .await;

        if self.view.binding().as_deref() == Some(conversation_id) {
            self.view.clear_binding();
            self.view.navigate(Location::Home);
        }

        Ok(())
    }
}
