//! Chat API client over reqwest.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use threadline_core::backend::{
    ChatBackend, CompletionRequest, CreateConversationRequest, ProfileRow, ProfileStore,
};
use threadline_core::conversation::Conversation;
use threadline_core::message::Message;
use threadline_core::model_catalog::ModelOption;
use threadline_core::{Result, ThreadlineError};

use crate::wire::{
    CreateBody, DataEnvelope, DeleteBody, ErrorEnvelope, SaveBody, SearchBody, SearchResponse,
    UNIQUE_VIOLATION_CODE, extract_reply,
};

/// HTTP implementation of [`ChatBackend`] and [`ProfileStore`].
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    client: Client,
    base_url: String,
}

impl HttpChatBackend {
    /// Creates a client against `base_url` (no trailing slash required).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Replaces the underlying reqwest client, e.g. to tune timeouts.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Passes 2xx responses through; maps everything else onto the shared
    /// error type, classifying uniqueness violations as conflicts.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error body".to_string());
        Err(map_http_error(status, &body))
    }
}

fn map_http_error(status: StatusCode, body: &str) -> ThreadlineError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let code = envelope.as_ref().and_then(|e| e.code.as_deref());

    if status == StatusCode::CONFLICT || code == Some(UNIQUE_VIOLATION_CODE) {
        return ThreadlineError::conflict("username");
    }

    let message = envelope
        .and_then(|e| e.error)
        .unwrap_or_else(|| body.to_string());
    ThreadlineError::backend(Some(status.as_u16()), message)
}

fn request_error(err: reqwest::Error) -> ThreadlineError {
    ThreadlineError::backend(err.status().map(|s| s.as_u16()), err.to_string())
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let response = self
            .client
            .get(self.url("/chat/list"))
            .query(&[("userId", user_id)])
            .send()
            .await
            .map_err(request_error)?;

        let envelope: DataEnvelope<Vec<Conversation>> = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(request_error)?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn create_conversation(
        &self,
        request: CreateConversationRequest,
    ) -> Result<Conversation> {
        let body = CreateBody {
            user_id: &request.user_id,
            title: &request.title,
            model: request.model.as_deref(),
        };
        let response = self
            .client
            .post(self.url("/chat/create"))
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let envelope: DataEnvelope<Conversation> = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(request_error)?;

        match envelope.data {
            Some(conversation) if !conversation.id.is_empty() => {
                debug!(conversation_id = %conversation.id, "conversation created");
                Ok(conversation)
            }
            _ => Err(ThreadlineError::backend(
                None,
                "create response carried no conversation id",
            )),
        }
    }

    async fn save_message(&self, message: &Message, user_id: &str) -> Result<()> {
        let role = message.role.to_string();
        let body = SaveBody {
            conversation_id: &message.conversation_id,
            user_id,
            role: &role,
            content: &message.content,
            model: message.model_used.as_deref(),
        };
        let response = self
            .client
            .post(self.url("/chat/save"))
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = SearchBody {
            user_id: &request.user_id,
            model: request.model.as_deref(),
            user_messages: &request.history,
        };
        let response = self
            .client
            .post(self.url("/chat/search"))
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let parsed: SearchResponse = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(request_error)?;
        Ok(extract_reply(parsed))
    }

    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let response = self
            .client
            .get(self.url(&format!("/chat/{conversation_id}")))
            .send()
            .await
            .map_err(request_error)?;

        let envelope: DataEnvelope<Vec<Message>> = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(request_error)?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let body = DeleteBody { conversation_id };
        let response = self
            .client
            .post(self.url("/chat/delete"))
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn list_models(&self) -> Result<Vec<ModelOption>> {
        let response = self
            .client
            .get(self.url("/chat/models"))
            .send()
            .await
            .map_err(request_error)?;

        let envelope: DataEnvelope<Vec<ModelOption>> = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(request_error)?;
        Ok(envelope.data.unwrap_or_default())
    }
}

#[async_trait]
impl ProfileStore for HttpChatBackend {
    async fn upsert_profile(&self, profile: &ProfileRow) -> Result<()> {
        let response = self
            .client
            .post(self.url("/users/upsert"))
            .json(profile)
            .send()
            .await
            .map_err(request_error)?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}
