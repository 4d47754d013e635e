//! Shared conversation registry and its change-feed drain.

use std::sync::{Arc, Mutex};

use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use threadline_core::conversation::{ChangeEvent, Conversation, ConversationRegistry};
use threadline_core::feed::Subscription;

/// Owns the canonical conversation list for one identity.
///
/// Two producers mutate it: local optimistic echoes (creation, deletion) and
/// the realtime subscription. Both go through [`ConversationRegistry::apply`],
/// so any interleaving of distinct events converges to the same list. A
/// `watch` revision channel tells surfaces when to re-read the snapshot.
pub struct RegistryService {
    registry: Arc<RwLock<ConversationRegistry>>,
    revision: Arc<watch::Sender<u64>>,
    feed_cancel: Mutex<Option<CancellationToken>>,
}

impl RegistryService {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            registry: Arc::new(RwLock::new(ConversationRegistry::new())),
            revision: Arc::new(revision),
            feed_cancel: Mutex::new(None),
        }
    }

    /// Replaces the contents with a freshly fetched list.
    pub async fn seed(&self, rows: Vec<Conversation>) {
        self.registry.write().await.seed(rows);
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Applies one event (local echo or remote change).
    ///
    /// Returns `true` when the list changed.
    pub async fn apply(&self, event: ChangeEvent) -> bool {
        Self::reduce(&self.registry, &self.revision, event).await
    }

    /// The current list, most recently active first.
    pub async fn snapshot(&self) -> Vec<Conversation> {
        self.registry.read().await.snapshot()
    }

    pub async fn get(&self, id: &str) -> Option<Conversation> {
        self.registry.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.registry.read().await.contains(id)
    }

    /// Subscribes to list revisions; the value only ever increases.
    pub fn revisions(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Attaches a change-feed subscription, replacing any previous one.
    ///
    /// The drain task applies events until the feed ends or is detached.
    /// When the feed ends on its own the registry goes silently stale until
    /// the owner resubscribes.
    pub fn attach(&self, mut subscription: Subscription) {
        let replaced = {
            let mut slot = self.feed_cancel.lock().unwrap();
            slot.replace(subscription.cancel_token())
        };
        if let Some(previous) = replaced {
            previous.cancel();
        }

        let registry = Arc::clone(&self.registry);
        let revision = Arc::clone(&self.revision);
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                Self::reduce(&registry, &revision, event).await;
            }
            debug!("change feed ended");
        });
    }

    /// Tears down the active subscription, if any.
    pub fn detach(&self) {
        if let Some(token) = self.feed_cancel.lock().unwrap().take() {
            token.cancel();
        }
    }

    async fn reduce(
        registry: &RwLock<ConversationRegistry>,
        revision: &watch::Sender<u64>,
        event: ChangeEvent,
    ) -> bool {
        let changed = registry.write().await.apply(event);
        if changed {
            revision.send_modify(|revision| *revision += 1);
        }
        changed
    }
}

impl Default for RegistryService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn convo(id: &str, updated_at: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            title: format!("Thread {id}"),
            owner_id: Some("u1".to_string()),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: Some(updated_at.to_string()),
        }
    }

    #[tokio::test]
    async fn test_apply_bumps_revision_only_on_change() {
        let service = RegistryService::new();
        let revisions = service.revisions();
        let initial = *revisions.borrow();

        assert!(
            service
                .apply(ChangeEvent::Insert(convo("c1", "2026-01-02T00:00:00Z")))
                .await
        );
        assert_eq!(*revisions.borrow(), initial + 1);

        // Deleting an unknown id changes nothing.
        assert!(
            !service
                .apply(ChangeEvent::Delete {
                    id: "missing".to_string()
                })
                .await
        );
        assert_eq!(*revisions.borrow(), initial + 1);
    }

    #[tokio::test]
    async fn test_attached_feed_events_reach_the_snapshot() {
        let service = RegistryService::new();
        let (tx, rx) = mpsc::channel(4);
        service.attach(Subscription::new(rx, CancellationToken::new()));

        let mut revisions = service.revisions();
        tx.send(ChangeEvent::Insert(convo("c1", "2026-01-02T00:00:00Z")))
            .await
            .unwrap();

        revisions.changed().await.unwrap();
        assert!(service.contains("c1").await);
    }

    #[tokio::test]
    async fn test_local_and_remote_events_converge() {
        let service = RegistryService::new();
        let (tx, rx) = mpsc::channel(4);
        service.attach(Subscription::new(rx, CancellationToken::new()));

        // Local echo inserts the row; the remote event for the same id later
        // confirms it with the server's committed view.
        service
            .apply(ChangeEvent::Insert(convo("c1", "2026-01-02T00:00:00Z")))
            .await;

        let mut revisions = service.revisions();
        tx.send(ChangeEvent::Update(convo("c1", "2026-01-03T00:00:00Z")))
            .await
            .unwrap();
        revisions.changed().await.unwrap();

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot[0].updated_at.as_deref(),
            Some("2026-01-03T00:00:00Z")
        );
    }

    #[tokio::test]
    async fn test_detach_cancels_the_subscription() {
        let service = RegistryService::new();
        let (_tx, rx) = mpsc::channel::<ChangeEvent>(1);
        let cancel = CancellationToken::new();
        let watcher = cancel.clone();

        service.attach(Subscription::new(rx, cancel));
        service.detach();
        assert!(watcher.is_cancelled());
    }
}
