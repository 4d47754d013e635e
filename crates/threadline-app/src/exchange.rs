//! Message exchange pipeline.
//!
//! One pipeline instance serves one conversation surface. An exchange walks
//! `Idle -> UserAppended -> PlaceholderAppended -> AwaitingResponse ->
//! {Resolved | Failed}`; both terminal states leave the surface interactive,
//! so a failed completion never wedges the input.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, warn};

use threadline_core::backend::{ChatBackend, CompletionRequest, CompletionTurn};
use threadline_core::message::{Message, MessageRole};
use threadline_core::model_catalog::{ModelOption, default_selection};
use threadline_core::transcript::Transcript;
use threadline_core::identity::Identity;
use threadline_core::{Result, ThreadlineError};

use crate::coordinator::ConversationCoordinator;
use crate::view::{Location, ViewEvent, ViewState};

/// Content written into the placeholder when a completion fails.
pub const COMPLETION_ERROR_TEXT: &str = "Error: Could not generate response.";

/// Maximum characters of input used as a lazily created conversation's title.
const TITLE_MAX_LEN: usize = 50;

/// Where the current exchange stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangePhase {
    #[default]
    Idle,
    UserAppended,
    PlaceholderAppended,
    AwaitingResponse,
    Resolved,
    Failed,
}

/// The request/response state machine turning user input into a persisted
/// user message, a placeholder, a completion call, and a resolved or errored
/// terminal message.
pub struct MessageExchange {
    backend: Arc<dyn ChatBackend>,
    coordinator: Arc<ConversationCoordinator>,
    view: Arc<ViewState>,
    identity: Identity,
    messages: RwLock<Vec<Message>>,
    streaming: AtomicBool,
    phase: StdRwLock<ExchangePhase>,
    catalog: RwLock<Vec<ModelOption>>,
    selected_model: StdRwLock<Option<String>>,
    events: mpsc::UnboundedSender<ViewEvent>,
}

impl MessageExchange {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        coordinator: Arc<ConversationCoordinator>,
        view: Arc<ViewState>,
        identity: Identity,
        events: mpsc::UnboundedSender<ViewEvent>,
    ) -> Self {
        Self {
            backend,
            coordinator,
            view,
            identity,
            messages: RwLock::new(Vec::new()),
            streaming: AtomicBool::new(false),
            phase: StdRwLock::new(ExchangePhase::Idle),
            catalog: RwLock::new(Vec::new()),
            selected_model: StdRwLock::new(None),
            events,
        }
    }

    /// Whether an exchange is in flight; surfaces disable submission while
    /// true.
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> ExchangePhase {
        *self.phase.read().unwrap()
    }

    pub fn selected_model(&self) -> Option<String> {
        self.selected_model.read().unwrap().clone()
    }

    /// The conversation this pipeline is currently bound to.
    pub fn binding(&self) -> Option<String> {
        self.view.binding()
    }

    /// Fetches the model catalog and picks the default selection.
    ///
    /// `preferred` (typically from configuration) wins when it names an
    /// available entry; otherwise the first available option is selected.
    pub async fn load_models(&self, preferred: Option<&str>) -> Result<Vec<ModelOption>> {
        let catalog = self.backend.list_models().await?;
        let preferred = preferred
            .map(str::to_string)
            .or_else(|| self.selected_model());
        *self.selected_model.write().unwrap() =
            default_selection(&catalog, preferred.as_deref());
        *self.catalog.write().await = catalog.clone();
        Ok(catalog)
    }

    /// Selects a model by id.
    ///
    /// # Errors
    ///
    /// Fails when a catalog has been loaded and the id is not part of it.
    pub async fn select_model(&self, model_id: &str) -> Result<()> {
        let catalog = self.catalog.read().await;
        if !catalog.is_empty() && !catalog.iter().any(|m| m.id == model_id) {
            return Err(ThreadlineError::not_found("ModelOption", model_id));
        }
        *self.selected_model.write().unwrap() = Some(model_id.to_string());
        Ok(())
    }

    /// The bound conversation's messages, in order.
    pub async fn messages(&self) -> Vec<Message> {
        let binding = self.view.binding();
        let messages = self.messages.read().await;
        match binding {
            Some(conversation_id) => messages
                .iter()
                .filter(|m| m.conversation_id == conversation_id)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Runs one exchange for the given input.
    ///
    /// Validation failures and conversation-creation failures return an
    /// error before any message exists. A completion failure is a recovered
    /// failure: the placeholder carries [`COMPLETION_ERROR_TEXT`], a notice
    /// is emitted, and `Ok(())` is returned with the phase left at `Failed`.
    pub async fn send_message(&self, input: &str) -> Result<()> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ThreadlineError::validation("empty input"));
        }
        if self.streaming.swap(true, Ordering::SeqCst) {
            return Err(ThreadlineError::validation(
                "an exchange is already in flight",
            ));
        }

        let result = self.run_exchange(text).await;
        self.streaming.store(false, Ordering::SeqCst);
        result
    }

    async fn run_exchange(&self, text: &str) -> Result<()> {
        let conversation_id = match self.view.binding() {
            Some(id) => id,
            None => {
                let title: String = text.chars().take(TITLE_MAX_LEN).collect();
                match self.coordinator.create_conversation(&title).await {
                    Ok(conversation) => conversation.id,
                    Err(err) => {
                        self.set_phase(ExchangePhase::Idle);
                        self.emit(ViewEvent::Notice(
                            "Failed to create conversation".to_string(),
                        ));
                        return Err(err);
                    }
                }
            }
        };

        let model = self.selected_model();
        let user_message = Message::user(&conversation_id, text, model.clone());
        let placeholder = Message::placeholder(&conversation_id, model.clone());
        let placeholder_id = placeholder.id.clone();

        // One write section: capture the history the completion will see and
        // append the optimistic pair, so the pair lands as a single visible
        // update and the history can never include the placeholder.
        let history = {
            let mut messages = self.messages.write().await;
            let mut history: Vec<CompletionTurn> = messages
                .iter()
                .filter(|m| {
                    m.conversation_id == conversation_id && m.role != MessageRole::System
                })
                .map(CompletionTurn::from)
                .collect();
            history.push(CompletionTurn::from(&user_message));

            messages.push(user_message.clone());
            self.set_phase(ExchangePhase::UserAppended);
            messages.push(placeholder.clone());
            self.set_phase(ExchangePhase::PlaceholderAppended);
            history
        };
        self.emit(ViewEvent::MessagesAppended {
            conversation_id: conversation_id.clone(),
            message_ids: vec![user_message.id.clone(), placeholder_id.clone()],
        });

        self.spawn_save(user_message);

        self.set_phase(ExchangePhase::AwaitingResponse);
        let request = CompletionRequest {
            user_id: self.identity.id.clone(),
            model,
            history,
        };

        match self.backend.complete(request).await {
            Ok(reply) => {
                debug!(
                    conversation_id = %conversation_id,
                    placeholder_id = %placeholder_id,
                    "completion resolved"
                );
                let resolved = self.overwrite_placeholder(&placeholder_id, &reply).await;
                self.emit(ViewEvent::MessageResolved {
                    conversation_id,
                    message_id: placeholder_id,
                });
                if let Some(message) = resolved {
                    self.spawn_save(message);
                }
                self.set_phase(ExchangePhase::Resolved);
            }
            Err(err) => {
                error!(conversation_id = %conversation_id, error = %err, "completion request failed");
                self.overwrite_placeholder(&placeholder_id, COMPLETION_ERROR_TEXT)
                    .await;
                self.emit(ViewEvent::MessageResolved {
                    conversation_id,
                    message_id: placeholder_id,
                });
                self.emit(ViewEvent::Notice("AI response failed".to_string()));
                self.set_phase(ExchangePhase::Failed);
            }
        }

        Ok(())
    }

    /// Opens an existing conversation: loads its persisted messages, binds
    /// the pipeline, and navigates the surface to it.
    pub async fn open_conversation(&self, conversation_id: &str) -> Result<()> {
        let loaded = self.backend.fetch_messages(conversation_id).await?;
        {
            let mut messages = self.messages.write().await;
            messages.retain(|m| m.conversation_id != conversation_id);
            messages.extend(loaded);
        }
        self.view.bind(conversation_id);
        self.view
            .navigate(Location::Conversation(conversation_id.to_string()));
        Ok(())
    }

    /// Drops locally cached messages of a deleted conversation.
    pub async fn purge_conversation(&self, conversation_id: &str) {
        self.messages
            .write()
            .await
            .retain(|m| m.conversation_id != conversation_id);
    }

    /// Exports the bound conversation's persisted transcript as text.
    pub async fn export_transcript(&self) -> Result<String> {
        let conversation_id = self
            .view
            .binding()
            .ok_or_else(|| ThreadlineError::validation("no conversation to export"))?;
        let messages = self.backend.fetch_messages(&conversation_id).await?;
        Ok(Transcript::from_messages(&messages).render())
    }

    // The placeholder is addressed by the id captured at creation time, so a
    // response can never land in a different exchange's placeholder.
    async fn overwrite_placeholder(&self, message_id: &str, content: &str) -> Option<Message> {
        let mut messages = self.messages.write().await;
        match messages.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                message.content = content.to_string();
                Some(message.clone())
            }
            None => {
                warn!(message_id, "placeholder vanished before resolution");
                None
            }
        }
    }

    fn spawn_save(&self, message: Message) {
        let backend = Arc::clone(&self.backend);
        let user_id = self.identity.id.clone();
        tokio::spawn(async move {
            if let Err(err) = backend.save_message(&message, &user_id).await {
                warn!(message_id = %message.id, error = %err, "message save failed");
            }
        });
    }

    fn set_phase(&self, phase: ExchangePhase) {
        *self.phase.write().unwrap() = phase;
    }

    fn emit(&self, event: ViewEvent) {
        // A dropped receiver only means the surface went away.
        let _ = self.events.send(event);
    }
}
