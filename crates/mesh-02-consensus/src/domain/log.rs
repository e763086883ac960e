//! Replicated log.
//!
//! Indices are 1-based; index 0 is the empty prefix with term 0. The entry at
//! position `i` of the backing vector always has `index == i + 1`.

use serde::{Deserialize, Serialize};
use shared_types::Timestamp;

/// One replicated command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub index: u64,
    pub term: u64,
    pub command: serde_json::Value,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaftLog {
    entries: Vec<LogEntry>,
}

impl RaftLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last_index(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn last_term(&self) -> u64 {
        self.entries.last().map_or(0, |e| e.term)
    }

    pub fn get(&self, index: u64) -> Option<&LogEntry> {
        let pos = usize::try_from(index.checked_sub(1)?).ok()?;
        self.entries.get(pos)
    }

    /// Term of the entry at `index`; `Some(0)` for index 0.
    pub fn term_at(&self, index: u64) -> Option<u64> {
        if index == 0 {
            return Some(0);
        }
        self.get(index).map(|e| e.term)
    }

    /// Up to `max` entries starting at `start`.
    pub fn entries_from(&self, start: u64, max: usize) -> Vec<LogEntry> {
        let Some(pos) = start.checked_sub(1).and_then(|p| usize::try_from(p).ok()) else {
            return Vec::new();
        };
        self.entries.iter().skip(pos).take(max).cloned().collect()
    }

    /// Append an entry carrying the next index.
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Drop `index` and everything after it.
    pub fn truncate_from(&mut self, index: u64) {
        let keep = usize::try_from(index.saturating_sub(1)).unwrap_or(usize::MAX);
        self.entries.truncate(keep);
    }

    /// Merge entries sent by a leader after a successful continuity check.
    ///
    /// Existing entries with the same index and term are kept; the first
    /// conflicting entry and everything after it is replaced. Returns `true`
    /// if the log changed.
    pub fn merge(&mut self, incoming: &[LogEntry]) -> bool {
        let mut changed = false;
        for entry in incoming {
            match self.term_at(entry.index) {
                Some(term) if term == entry.term => continue,
                Some(_) => {
                    self.truncate_from(entry.index);
                    self.entries.push(entry.clone());
                    changed = true;
                }
                None if entry.index == self.last_index() + 1 => {
                    self.entries.push(entry.clone());
                    changed = true;
                }
                // A gap means the batch does not continue this log.
                None => break,
            }
        }
        changed
    }

    /// Whether a log ending at (`last_log_index`, `last_log_term`) is at least
    /// as up to date as this one: compare last terms, then lengths.
    pub fn is_up_to_date(&self, last_log_index: u64, last_log_term: u64) -> bool {
        let my_term = self.last_term();
        last_log_term > my_term || (last_log_term == my_term && last_log_index >= self.last_index())
    }
}
