//! In-memory fakes for the backend traits, used across controller tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use threadline_core::backend::{
    ChatBackend, CompletionRequest, CreateConversationRequest, ProfileRow, ProfileStore,
};
use threadline_core::conversation::Conversation;
use threadline_core::message::Message;
use threadline_core::model_catalog::ModelOption;
use threadline_core::{Result, ThreadlineError};

pub(crate) struct MockBackend {
    pub conversations: Mutex<Vec<Conversation>>,
    pub created: Mutex<Vec<CreateConversationRequest>>,
    pub saved: Mutex<Vec<Message>>,
    pub completions: Mutex<Vec<CompletionRequest>>,
    pub transcript: Mutex<Vec<Message>>,
    pub models: Mutex<Vec<ModelOption>>,
    reply: Mutex<String>,
    next_id: AtomicUsize,
    fail_create: AtomicBool,
    fail_complete: AtomicBool,
    fail_delete: AtomicBool,
    complete_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            conversations: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
            transcript: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
            reply: Mutex::new("Hi there".to_string()),
            next_id: AtomicUsize::new(1),
            fail_create: AtomicBool::new(false),
            fail_complete: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            complete_gate: Mutex::new(None),
        }
    }

    pub fn set_reply(&self, reply: &str) {
        *self.reply.lock().unwrap() = reply.to_string();
    }

    pub fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_complete(&self) {
        self.fail_complete.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    /// Makes `complete` block until the returned handle is notified.
    pub fn gate_completions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.complete_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn list_conversations(&self, _user_id: &str) -> Result<Vec<Conversation>> {
        Ok(self.conversations.lock().unwrap().clone())
    }

    async fn create_conversation(
        &self,
        request: CreateConversationRequest,
    ) -> Result<Conversation> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ThreadlineError::backend(Some(500), "create failed"));
        }
        let id = format!("c{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let conversation = Conversation::new(id, request.title.clone(), request.user_id.clone());
        self.created.lock().unwrap().push(request);
        Ok(conversation)
    }

    async fn save_message(&self, message: &Message, _user_id: &str) -> Result<()> {
        self.saved.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.completions.lock().unwrap().push(request);
        let gate = self.complete_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(ThreadlineError::backend(None, "connection refused"));
        }
        Ok(self.reply.lock().unwrap().clone())
    }

    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .transcript
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn delete_conversation(&self, _conversation_id: &str) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ThreadlineError::backend(Some(500), "delete failed"));
        }
        Ok(())
    }

    async fn list_models(&self) -> Result<Vec<ModelOption>> {
        Ok(self.models.lock().unwrap().clone())
    }
}

pub(crate) struct MockProfileStore {
    pub upserts: Mutex<Vec<ProfileRow>>,
    conflicts_remaining: AtomicUsize,
    fail_fatal: AtomicBool,
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self {
            upserts: Mutex::new(Vec::new()),
            conflicts_remaining: AtomicUsize::new(0),
            fail_fatal: AtomicBool::new(false),
        }
    }

    /// Reports a username conflict for the first `count` upserts.
    pub fn with_conflicts(self, count: usize) -> Self {
        self.conflicts_remaining.store(count, Ordering::SeqCst);
        self
    }

    pub fn fail_fatal(self) -> Self {
        self.fail_fatal.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn upsert_profile(&self, profile: &ProfileRow) -> Result<()> {
        self.upserts.lock().unwrap().push(profile.clone());

        if self.fail_fatal.load(Ordering::SeqCst) {
            return Err(ThreadlineError::backend(Some(500), "profiles table unavailable"));
        }

        let remaining = self.conflicts_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.conflicts_remaining.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(ThreadlineError::conflict("username"));
        }

        Ok(())
    }
}
