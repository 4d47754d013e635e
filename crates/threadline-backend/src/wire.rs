//! Wire shapes for the chat API.

use serde::{Deserialize, Serialize};

use threadline_core::ThreadlineError;
use threadline_core::backend::CompletionTurn;
use threadline_core::conversation::{ChangeEvent, Conversation};

/// Reply used when a completion response parses but carries no text.
pub const REPLY_FALLBACK: &str = "…";

/// The `{data: …}` envelope wrapping most responses.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct DataEnvelope<T> {
    #[serde(default)]
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateBody<'a> {
    pub user_id: &'a str,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveBody<'a> {
    pub conversation_id: &'a str,
    pub user_id: &'a str,
    pub role: &'a str,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchBody<'a> {
    pub user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub user_messages: &'a [CompletionTurn],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteBody<'a> {
    pub conversation_id: &'a str,
}

/// Completion response: `{providerResp: {choices: [...]}}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub provider_resp: Option<ProviderResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProviderResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One provider choice, in either the chat (`message.content`) or legacy
/// completion (`text`) shape.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Extracts the reply text from a parsed completion response.
///
/// Supports both choice shapes and falls back to [`REPLY_FALLBACK`] when
/// neither carries text.
pub(crate) fn extract_reply(response: SearchResponse) -> String {
    response
        .provider_resp
        .and_then(|provider| provider.choices.into_iter().next())
        .and_then(|choice| {
            choice
                .message
                .and_then(|message| message.content)
                .or(choice.text)
        })
        .unwrap_or_else(|| REPLY_FALLBACK.to_string())
}

/// Error envelope returned by the backend on failures.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Postgres unique-violation code, as surfaced by the persistence layer.
pub(crate) const UNIQUE_VIOLATION_CODE: &str = "23505";

/// A raw change-feed row: `{eventType, new?, old?}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireChangeEvent {
    pub event_type: String,
    #[serde(default)]
    pub new: Option<Conversation>,
    #[serde(default)]
    pub old: Option<DeletedRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeletedRow {
    pub id: String,
}

impl TryFrom<WireChangeEvent> for ChangeEvent {
    type Error = ThreadlineError;

    fn try_from(wire: WireChangeEvent) -> Result<Self, Self::Error> {
        match wire.event_type.as_str() {
            "INSERT" => wire
                .new
                .map(ChangeEvent::Insert)
                .ok_or_else(|| ThreadlineError::subscription("INSERT event without a row")),
            "UPDATE" => wire
                .new
                .map(ChangeEvent::Update)
                .ok_or_else(|| ThreadlineError::subscription("UPDATE event without a row")),
            "DELETE" => wire
                .old
                .map(|row| ChangeEvent::Delete { id: row.id })
                .ok_or_else(|| ThreadlineError::subscription("DELETE event without an id")),
            other => Err(ThreadlineError::subscription(format!(
                "unknown change-feed event type: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_reply_chat_shape() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"providerResp":{"choices":[{"message":{"content":"Hi there"}}]}}"#,
        )
        .unwrap();
        assert_eq!(extract_reply(response), "Hi there");
    }

    #[test]
    fn test_extract_reply_text_shape() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"providerResp":{"choices":[{"text":"Hi there"}]}}"#).unwrap();
        assert_eq!(extract_reply(response), "Hi there");
    }

    #[test]
    fn test_extract_reply_falls_back_to_ellipsis() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"providerResp":{"choices":[{}]}}"#).unwrap();
        assert_eq!(extract_reply(response), REPLY_FALLBACK);

        let empty: SearchResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(extract_reply(empty), REPLY_FALLBACK);
    }

    #[test]
    fn test_change_event_insert_and_update() {
        let wire: WireChangeEvent = serde_json::from_str(
            r#"{"eventType":"INSERT","new":{"id":"c1","title":"T","user_id":"u1","created_at":"2026-01-01T00:00:00Z","updated_at":null}}"#,
        )
        .unwrap();
        let event = ChangeEvent::try_from(wire).unwrap();
        assert!(matches!(event, ChangeEvent::Insert(ref c) if c.id == "c1"));

        let wire: WireChangeEvent = serde_json::from_str(
            r#"{"eventType":"UPDATE","new":{"id":"c1","title":"Renamed","created_at":"2026-01-01T00:00:00Z"}}"#,
        )
        .unwrap();
        assert!(matches!(
            ChangeEvent::try_from(wire).unwrap(),
            ChangeEvent::Update(ref c) if c.title == "Renamed"
        ));
    }

    #[test]
    fn test_change_event_delete_carries_only_the_id() {
        let wire: WireChangeEvent =
            serde_json::from_str(r#"{"eventType":"DELETE","old":{"id":"c1"}}"#).unwrap();
        assert_eq!(
            ChangeEvent::try_from(wire).unwrap(),
            ChangeEvent::Delete {
                id: "c1".to_string()
            }
        );
    }

    #[test]
    fn test_change_event_unknown_type_is_rejected() {
        let wire: WireChangeEvent =
            serde_json::from_str(r#"{"eventType":"TRUNCATE"}"#).unwrap();
        assert!(ChangeEvent::try_from(wire).is_err());
    }

    #[test]
    fn test_save_body_casing() {
        let body = SaveBody {
            conversation_id: "c1",
            user_id: "u1",
            role: "user",
            content: "Hello",
            model: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["conversationId"], "c1");
        assert_eq!(json["userId"], "u1");
        assert!(json.get("model").is_none());
    }
}
