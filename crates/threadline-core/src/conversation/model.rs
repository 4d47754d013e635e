//! Conversation summary model.

use serde::{Deserialize, Serialize};

/// A titled, ordered container for messages belonging to one identity.
///
/// This is the summary row held by the registry; message bodies live with the
/// exchange pipeline. The row mirrors the backend's persisted shape, so
/// change-feed payloads deserialize into it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier (UUID format)
    pub id: String,
    /// Human-readable conversation title
    pub title: String,
    /// Owning identity id
    #[serde(rename = "user_id", default)]
    pub owner_id: Option<String>,
    /// Timestamp when the conversation was created (RFC 3339 format)
    #[serde(default)]
    pub created_at: String,
    /// Timestamp of the last activity, if any (RFC 3339 format)
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Conversation {
    /// Creates a new summary stamped with the current time.
    pub fn new(id: impl Into<String>, title: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            title: title.into(),
            owner_id: Some(owner_id.into()),
            created_at: now.clone(),
            updated_at: Some(now),
        }
    }

    /// The sort key for list order: `updated_at` falling back to `created_at`.
    ///
    /// Timestamps are RFC 3339 UTC strings, so lexicographic comparison is
    /// chronological.
    pub fn sort_key(&self) -> &str {
        self.updated_at.as_deref().unwrap_or(&self.created_at)
    }
}
