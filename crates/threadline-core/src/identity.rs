//! Signed-in identity and its lifecycle.
//!
//! The identity provider is an external collaborator: the controller only
//! consumes the current identity's id and display attributes. Controllers
//! receive the [`Identity`] by constructor injection so tests can pass
//! fixtures instead of reaching into ambient session state.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// The signed-in identity for the current session.
///
/// Immutable for the lifetime of a session. Display attributes feed the
/// username bootstrap; everything else keys requests by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique identity identifier (UUID format)
    pub id: String,
    /// Account email, if known
    #[serde(default)]
    pub email: Option<String>,
    /// Human-readable display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar image reference
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Identity {
    /// Creates an identity with only an id, as used by headless surfaces.
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            display_name: None,
            avatar_url: None,
        }
    }

    /// The best available source string for username derivation.
    ///
    /// Prefers the display name and falls back to the email address, matching
    /// the profile attributes the bootstrap persists.
    pub fn username_source(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or_default()
    }
}

/// Lifecycle events published by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentityEvent {
    /// A new identity signed in.
    SignedIn(Identity),
    /// The current identity signed out.
    SignedOut,
    /// The identity's attributes changed in place.
    Changed(Identity),
}

/// Supplies the current signed-in identity and its lifecycle stream.
pub trait IdentityProvider: Send + Sync {
    /// Returns the current identity, if one is signed in.
    fn current(&self) -> Option<Identity>;

    /// Subscribes to lifecycle events.
    ///
    /// The receiver's initial value reflects the state at subscription time.
    fn events(&self) -> watch::Receiver<IdentityEvent>;
}

/// Provider backed by a fixed identity, for terminal surfaces and tests.
#[derive(Debug)]
pub struct StaticIdentityProvider {
    identity: Identity,
    events: watch::Sender<IdentityEvent>,
}

impl StaticIdentityProvider {
    pub fn new(identity: Identity) -> Self {
        let (events, _) = watch::channel(IdentityEvent::SignedIn(identity.clone()));
        Self { identity, events }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn current(&self) -> Option<Identity> {
        Some(self.identity.clone())
    }

    fn events(&self) -> watch::Receiver<IdentityEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_source_prefers_display_name() {
        let mut identity = Identity::anonymous("u1");
        identity.email = Some("jane@example.com".to_string());
        assert_eq!(identity.username_source(), "jane@example.com");

        identity.display_name = Some("Jane Doe".to_string());
        assert_eq!(identity.username_source(), "Jane Doe");
    }

    #[test]
    fn test_static_provider_reports_signed_in() {
        let provider = StaticIdentityProvider::new(Identity::anonymous("u1"));
        assert_eq!(provider.current().map(|i| i.id), Some("u1".to_string()));

        let events = provider.events();
        assert!(matches!(*events.borrow(), IdentityEvent::SignedIn(_)));
    }
}
