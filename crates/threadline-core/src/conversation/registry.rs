//! Conversation registry reducer.

use tracing::debug;

use super::{ChangeEvent, Conversation};

/// The ordered collection of conversation summaries for one identity.
///
/// The registry is a pure reducer over [`ChangeEvent`]s: it holds no channel,
/// lock, or connection, so it is testable without a live feed. The merge is
/// idempotent and order-tolerant across distinct ids; within a single id, the
/// id's own event order is respected (last writer wins on the full row).
#[derive(Debug, Clone, Default)]
pub struct ConversationRegistry {
    entries: Vec<Conversation>,
}

impl ConversationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents with a freshly fetched list.
    ///
    /// Used once at startup, before the change feed is attached.
    pub fn seed(&mut self, rows: Vec<Conversation>) {
        self.entries = rows;
        self.resort();
    }

    /// Applies one change event and recomputes the sort order.
    ///
    /// * `Insert`/`Update`: replace the full row if the id exists (the
    ///   incoming row is authoritative for that id), otherwise add it.
    /// * `Delete`: remove the matching id; an unknown id is a no-op.
    ///
    /// Returns `true` when the registry contents changed.
    pub fn apply(&mut self, event: ChangeEvent) -> bool {
        let changed = match event {
            ChangeEvent::Insert(row) | ChangeEvent::Update(row) => {
                match self.entries.iter_mut().find(|c| c.id == row.id) {
                    Some(existing) => {
                        if *existing == row {
                            false
                        } else {
                            *existing = row;
                            true
                        }
                    }
                    None => {
                        self.entries.push(row);
                        true
                    }
                }
            }
            ChangeEvent::Delete { ref id } => {
                let before = self.entries.len();
                self.entries.retain(|c| &c.id != id);
                before != self.entries.len()
            }
        };

        if changed {
            self.resort();
            debug!(count = self.entries.len(), "registry updated");
        }
        changed
    }

    /// Looks up a conversation by id.
    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.entries.iter().find(|c| c.id == id)
    }

    /// Whether a conversation with this id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// The current list, most recently active first.
    pub fn snapshot(&self) -> Vec<Conversation> {
        self.entries.clone()
    }

    /// Iterates the list in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Descending by updated_at falling back to created_at. Ties keep their
    // relative order so repeated applications are stable.
    fn resort(&mut self) {
        self.entries
            .sort_by(|a, b| b.sort_key().cmp(a.sort_key()));
    }
}
