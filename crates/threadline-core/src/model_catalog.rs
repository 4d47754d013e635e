//! Completion model catalog.

use serde::{Deserialize, Serialize};

/// One entry of the read-only model catalog.
///
/// The catalog is fetched once per surface; selection is local controller
/// state and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOption {
    /// Stable model identifier sent with completion requests
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Whether the model currently accepts requests
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

/// Picks the default selection from a freshly fetched catalog.
///
/// The first available option wins; a configured preference takes precedence
/// when it names a catalog entry.
pub fn default_selection(catalog: &[ModelOption], preferred: Option<&str>) -> Option<String> {
    if let Some(preferred) = preferred {
        if catalog.iter().any(|m| m.id == preferred && m.available) {
            return Some(preferred.to_string());
        }
    }
    catalog
        .iter()
        .find(|m| m.available)
        .map(|m| m.id.clone())
}
