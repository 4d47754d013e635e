//! Surface-facing view state and events.
//!
//! Navigation (what the surface displays) and identity binding (which
//! conversation the pipeline talks to) are two independently settable fields.
//! Conversation creation performs a *silent* location update - binding plus
//! location, no navigation event - so an in-flight exchange surface is never
//! remounted under the user's typing.

use std::sync::RwLock;

use tokio::sync::watch;

/// What a surface displays.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Location {
    /// The neutral landing view.
    #[default]
    Home,
    /// A specific conversation.
    Conversation(String),
}

/// Events published by the controllers for a surface to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// The optimistic user/placeholder pair appeared as one update.
    MessagesAppended {
        conversation_id: String,
        message_ids: Vec<String>,
    },
    /// A placeholder resolved (or errored) in place.
    MessageResolved {
        conversation_id: String,
        message_id: String,
    },
    /// A transient user-visible notice.
    Notice(String),
}

/// Shared view state for one surface.
#[derive(Debug)]
pub struct ViewState {
    binding: RwLock<Option<String>>,
    location: RwLock<Location>,
    navigations: watch::Sender<Location>,
}

impl ViewState {
    pub fn new() -> Self {
        let (navigations, _) = watch::channel(Location::Home);
        Self {
            binding: RwLock::new(None),
            location: RwLock::new(Location::Home),
            navigations,
        }
    }

    /// Binds the exchange pipeline to a conversation. No navigation event.
    pub fn bind(&self, conversation_id: impl Into<String>) {
        *self.binding.write().unwrap() = Some(conversation_id.into());
    }

    /// Clears the pipeline binding.
    pub fn clear_binding(&self) {
        *self.binding.write().unwrap() = None;
    }

    /// The conversation the pipeline is currently bound to.
    pub fn binding(&self) -> Option<String> {
        self.binding.read().unwrap().clone()
    }

    /// Updates the displayed location silently: observers of
    /// [`ViewState::navigations`] are not woken, so the surface keeps its
    /// mounted state.
    pub fn set_location(&self, location: Location) {
        *self.location.write().unwrap() = location;
    }

    /// Navigates: updates the location and wakes navigation observers.
    pub fn navigate(&self, location: Location) {
        *self.location.write().unwrap() = location.clone();
        let _ = self.navigations.send(location);
    }

    /// The currently displayed location.
    pub fn location(&self) -> Location {
        self.location.read().unwrap().clone()
    }

    /// Subscribes to remount-triggering navigations.
    pub fn navigations(&self) -> watch::Receiver<Location> {
        self.navigations.subscribe()
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}
