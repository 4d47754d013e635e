//! One-shot profile bootstrap after sign-in.

use std::sync::Arc;

use tracing::{debug, warn};

use threadline_core::backend::{ProfileRow, ProfileStore};
use threadline_core::config::ProfileConfig;
use threadline_core::identity::Identity;
use threadline_core::retry::retry_bounded;
use threadline_core::username::generate_username;
use threadline_core::{Result, ThreadlineError};

/// Allocates a short, collision-resistant username and persists the
/// identity's profile row.
///
/// Runs once, immediately after first sign-in. A username conflict draws a
/// fresh suffix and retries within a bounded budget; exhausting the budget is
/// non-fatal - the session proceeds and the profile stays without a username
/// until the next opportunity.
pub struct UsernameBootstrap {
    store: Arc<dyn ProfileStore>,
    username_max_len: usize,
    attempts: usize,
}

impl UsernameBootstrap {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self::with_config(store, &ProfileConfig::default())
    }

    pub fn with_config(store: Arc<dyn ProfileStore>, config: &ProfileConfig) -> Self {
        Self {
            store,
            username_max_len: config.username_max_len,
            attempts: config.bootstrap_attempts,
        }
    }

    /// Upserts the profile row, resolving username collisions by
    /// regeneration.
    ///
    /// Returns the persisted username, or `None` when the retry budget was
    /// exhausted by collisions.
    ///
    /// # Errors
    ///
    /// Any non-conflict persistence failure aborts without retry.
    pub async fn run(&self, identity: &Identity) -> Result<Option<String>> {
        let source = identity.username_source().to_string();

        let result = retry_bounded(
            self.attempts,
            |attempt| {
                let username =
                    generate_username(&source, self.username_max_len, &mut rand::thread_rng());
                if attempt > 0 {
                    debug!(attempt, username = %username, "retrying with a fresh username");
                }
                let profile = ProfileRow {
                    id: identity.id.clone(),
                    email: identity.email.clone(),
                    name: identity.display_name.clone().unwrap_or_default(),
                    username,
                    avatar_url: identity.avatar_url.clone(),
                };
                let store = Arc::clone(&self.store);
                async move {
                    store.upsert_profile(&profile).await?;
                    Ok(profile.username)
                }
            },
            ThreadlineError::is_conflict,
        )
        .await;

        match result {
            Ok(username) => {
                debug!(username = %username, "profile bootstrapped");
                Ok(Some(username))
            }
            Err(err) if err.is_conflict() => {
                warn!(
                    attempts = self.attempts,
                    "username attempts exhausted; proceeding without one"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockProfileStore;

    fn identity() -> Identity {
        Identity {
            id: "u1".to_string(),
            email: Some("jane@example.com".to_string()),
            display_name: Some("Jane Doe".to_string()),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_first_candidate_usually_sticks() {
        let store = Arc::new(MockProfileStore::new());
        let bootstrap = UsernameBootstrap::new(store.clone());

        let username = bootstrap.run(&identity()).await.unwrap().unwrap();

        assert!(username.starts_with("janed"));
        assert_eq!(username.len(), 8);
        assert_eq!(store.upserts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_conflicts_draw_fresh_suffixes() {
        let store = Arc::new(MockProfileStore::new().with_conflicts(3));
        let bootstrap = UsernameBootstrap::new(store.clone());

        let username = bootstrap.run(&identity()).await.unwrap();
        assert!(username.is_some());

        let upserts = store.upserts.lock().unwrap();
        assert_eq!(upserts.len(), 4);
        // Every candidate keeps the derived base and the target length.
        for row in upserts.iter() {
            assert!(row.username.starts_with("janed"));
            assert_eq!(row.username.len(), 8);
            assert_eq!(row.id, "u1");
            assert_eq!(row.name, "Jane Doe");
        }
    }

    #[tokio::test]
    async fn test_exhaustion_is_nonfatal() {
        let store = Arc::new(MockProfileStore::new().with_conflicts(usize::MAX));
        let bootstrap = UsernameBootstrap::new(store.clone());

        let username = bootstrap.run(&identity()).await.unwrap();

        assert_eq!(username, None);
        assert_eq!(store.upserts.lock().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_other_errors_abort_without_retry() {
        let store = Arc::new(MockProfileStore::new().fail_fatal());
        let bootstrap = UsernameBootstrap::new(store.clone());

        assert!(bootstrap.run(&identity()).await.is_err());
        assert_eq!(store.upserts.lock().unwrap().len(), 1);
    }
}
