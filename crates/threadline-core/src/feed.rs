//! Change-feed subscription abstraction.
//!
//! The realtime adapter publishes typed [`ChangeEvent`]s onto a channel; the
//! registry is a pure reducer consuming that channel. Nothing downstream of
//! the [`Subscription`] knows about the transport.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::conversation::ChangeEvent;
use crate::error::Result;

/// A live change-feed subscription.
///
/// Dropping the subscription cancels the pump task feeding it.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<ChangeEvent>,
    cancel: CancellationToken,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<ChangeEvent>, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// Receives the next event; `None` once the feed has ended.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// A handle that tears the subscription down when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Tears the subscription down.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A server-pushed change feed scoped to one identity's conversations.
///
/// Established once an identity is known; torn down on identity change or
/// surface teardown. The baseline holds no reconnection policy: a dropped
/// connection ends the subscription and the owner decides whether to
/// resubscribe.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Opens a subscription for rows owned by `owner_id`.
    async fn subscribe(&self, owner_id: &str) -> Result<Subscription>;
}
