//! Realtime change-feed adapter.
//!
//! Subscribes to the server-sent event stream of conversation changes and
//! pumps typed events onto the subscription channel. The adapter holds no
//! reconnection policy: when the stream drops, the subscription ends and the
//! registry goes silently stale until the owner resubscribes.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use threadline_core::conversation::ChangeEvent;
use threadline_core::feed::{ChangeFeed, Subscription};
use threadline_core::{Result, ThreadlineError};

use crate::wire::WireChangeEvent;

const EVENT_BUFFER: usize = 64;

/// SSE implementation of [`ChangeFeed`].
#[derive(Debug, Clone)]
pub struct SseChangeFeed {
    client: Client,
    subscribe_url: String,
}

impl SseChangeFeed {
    /// Creates a feed against the absolute subscribe URL.
    pub fn new(subscribe_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            subscribe_url: subscribe_url.into(),
        }
    }

    /// Replaces the underlying reqwest client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl ChangeFeed for SseChangeFeed {
    async fn subscribe(&self, owner_id: &str) -> Result<Subscription> {
        let response = self
            .client
            .get(&self.subscribe_url)
            .query(&[("userId", owner_id)])
            .send()
            .await
            .map_err(|err| ThreadlineError::subscription(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ThreadlineError::subscription(format!(
                "subscribe returned {}",
                response.status()
            )));
        }

        debug!(owner_id, "change feed subscribed");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        tokio::spawn(pump(response, tx, cancel.clone()));

        Ok(Subscription::new(rx, cancel))
    }
}

/// Reads the byte stream line by line until cancellation, stream end, or a
/// dropped receiver, forwarding every parseable event.
async fn pump(
    response: reqwest::Response,
    tx: mpsc::Sender<ChangeEvent>,
    cancel: CancellationToken,
) {
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    while let Some(newline) = buffer.find('\n') {
                        let line = buffer[..newline].trim_end_matches('\r').to_string();
                        buffer.drain(..=newline);
                        if let Some(event) = parse_sse_line(&line) {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                }
                Some(Err(err)) => {
                    warn!(error = %err, "change feed stream error");
                    break;
                }
                None => break,
            },
        }
    }
}

/// Parses one SSE line into a change event.
///
/// Comment/keepalive lines and non-`data:` fields yield `None`; malformed
/// payloads are logged and skipped rather than tearing the feed down.
fn parse_sse_line(line: &str) -> Option<ChangeEvent> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }

    match serde_json::from_str::<WireChangeEvent>(payload) {
        Ok(wire) => match ChangeEvent::try_from(wire) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(error = %err, "skipping change-feed event");
                None
            }
        },
        Err(err) => {
            warn!(error = %err, "unparseable change-feed payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_line() {
        let line = r#"data: {"eventType":"INSERT","new":{"id":"c1","title":"T","created_at":"2026-01-01T00:00:00Z"}}"#;
        assert!(matches!(
            parse_sse_line(line),
            Some(ChangeEvent::Insert(ref c)) if c.id == "c1"
        ));
    }

    #[test]
    fn test_keepalives_and_comments_are_skipped() {
        assert_eq!(parse_sse_line(""), None);
        assert_eq!(parse_sse_line(": keepalive"), None);
        assert_eq!(parse_sse_line("event: ping"), None);
        assert_eq!(parse_sse_line("data:"), None);
    }

    #[test]
    fn test_malformed_payloads_are_skipped() {
        assert_eq!(parse_sse_line("data: not-json"), None);
        assert_eq!(parse_sse_line(r#"data: {"eventType":"TRUNCATE"}"#), None);
    }

    #[test]
    fn test_delete_payload() {
        let line = r#"data: {"eventType":"DELETE","old":{"id":"c9"}}"#;
        assert_eq!(
            parse_sse_line(line),
            Some(ChangeEvent::Delete {
                id: "c9".to_string()
            })
        );
    }
}
