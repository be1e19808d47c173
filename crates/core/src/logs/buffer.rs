//! Capped, strictly ordered log buffer.

use chrono::Utc;
use cm_protocol::{ExecutionLogEntry, LogCategory, DEFAULT_MAX_LOGS};
use std::collections::VecDeque;

/// Append-only log buffer that retains the most recent `capacity` entries.
///
/// Appending past the cap evicts the oldest entry. Entries are never
/// reordered or deduplicated, and ids keep increasing across [`clear`]
/// calls so they stay unique for the whole session.
///
/// [`clear`]: LogBuffer::clear
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<ExecutionLogEntry>,
    capacity: usize,
    next_id: u64,
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` entries.
    ///
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_MAX_LOGS)),
            capacity,
            next_id: 0,
        }
    }

    /// Create a new entry stamped with the current time and append it.
    ///
    /// Returns a copy of the stored entry.
    pub fn push(
        &mut self,
        text: impl Into<String>,
        category: LogCategory,
        important: bool,
    ) -> ExecutionLogEntry {
        let entry = ExecutionLogEntry {
            id: self.next_id,
            timestamp: Utc::now(),
            category,
            text: text.into(),
            important,
        };
        self.next_id += 1;
        self.push_entry(entry.clone());
        entry
    }

    /// Append an entry created elsewhere, keeping its id and timestamp.
    pub fn push_entry(&mut self, entry: ExecutionLogEntry) {
        self.next_id = self.next_id.max(entry.id + 1);
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Remove every entry. The id sequence is not reset.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate in arrival order, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ExecutionLogEntry> + '_ {
        self.entries.iter()
    }

    /// Iterate over entries flagged as important, in arrival order.
    pub fn important(&self) -> impl Iterator<Item = &ExecutionLogEntry> + '_ {
        self.entries.iter().filter(|entry| entry.important)
    }

    pub fn last(&self) -> Option<&ExecutionLogEntry> {
        self.entries.back()
    }

    /// Copy the retained entries into a `Vec`, oldest first.
    pub fn to_vec(&self) -> Vec<ExecutionLogEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOGS)
    }
}
