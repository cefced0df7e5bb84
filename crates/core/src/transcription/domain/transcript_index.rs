use std::collections::BTreeMap;

use super::transcript_entry::TranscriptEntry;

/// Transcript texts for one output location, ordered by start offset.
///
/// Read-only once built; lookups never depend on the order entries were loaded in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TranscriptIndex {
    entries: BTreeMap<u32, String>,
}

impl TranscriptIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = TranscriptEntry>) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    /// Adds an entry; a later entry with the same offset replaces the earlier one.
    pub fn insert(&mut self, entry: TranscriptEntry) {
        if self
            .entries
            .insert(entry.start_offset_seconds, entry.text)
            .is_some()
        {
            log::warn!(
                "Duplicate transcript offset {}s; keeping the last one",
                entry.start_offset_seconds
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn offsets(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    /// Texts of entries with offsets in `[t - w, t + w]`, ascending, one per line.
    pub fn context_window(&self, timestamp_seconds: u32, window_seconds: u32) -> String {
        let low = timestamp_seconds.saturating_sub(window_seconds);
        let high = timestamp_seconds.saturating_add(window_seconds);
        self.entries
            .range(low..=high)
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
