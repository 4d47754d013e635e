//! Transcript rendering and parsing.
//!
//! A transcript is the plain-text export of one conversation: `ROLE: content`
//! blocks separated by blank lines. Rendering and parsing are inverses for
//! role/content pairs, including content containing blank lines, as long as a
//! content block does not itself start with a `ROLE: ` prefix.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::message::{Message, MessageRole};

/// One role/content pair of an exported transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: MessageRole,
    pub content: String,
}

/// An exported conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    pub entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Builds a transcript from an in-memory message list, in order.
    pub fn from_messages(messages: &[Message]) -> Self {
        Self {
            entries: messages
                .iter()
                .map(|m| TranscriptEntry {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
        }
    }

    /// Renders the transcript as `ROLE: content` blocks.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.role.to_string().to_uppercase(), e.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Parses a rendered transcript back into role/content pairs.
    ///
    /// Blocks without a recognized `ROLE: ` prefix are treated as blank-line
    /// continuations of the previous entry's content.
    pub fn parse(text: &str) -> Self {
        let mut entries: Vec<TranscriptEntry> = Vec::new();

        for block in text.split("\n\n") {
            let parsed = block.split_once(": ").and_then(|(prefix, rest)| {
                MessageRole::from_str(prefix)
                    .ok()
                    .map(|role| (role, rest.to_string()))
            });

            match parsed {
                Some((role, content)) => entries.push(TranscriptEntry { role, content }),
                None => {
                    if let Some(last) = entries.last_mut() {
                        last.content.push_str("\n\n");
                        last.content.push_str(block);
                    }
                }
            }
        }

        Self { entries }
    }
}
