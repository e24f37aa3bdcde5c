//! Append-only message log
//!
//! The log owns id assignment and timestamping, so entries always come out in
//! creation order with ids that are never reused. `append` is the only
//! mutation; readers take a `snapshot()` and must request a new one after
//! every append.

use chrono::Utc;

use crate::models::{ConversationEntry, EntryDraft, EntryId};

#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<ConversationEntry>,
    last_id: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry at the tail and return a copy of what was stored.
    pub fn append(&mut self, draft: EntryDraft) -> ConversationEntry {
        self.last_id += 1;
        let entry = ConversationEntry::new(EntryId(self.last_id), Utc::now(), draft);
        tracing::trace!(
            entry_id = %entry.id(),
            variant = ?entry.variant(),
            "Appended conversation entry"
        );
        self.entries.push(entry.clone());
        entry
    }

    pub fn snapshot(&self) -> Vec<ConversationEntry> {
        self.entries.clone()
    }

    /// Entries appended after the first `seen` ones.
    pub fn since(&self, seen: usize) -> Vec<ConversationEntry> {
        self.entries.get(seen..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
