use super::record::{ActionType, LogLevel};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_MAX_LOG_ENTRIES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogEntryId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub timestamp_ms: u64,
    pub level: LogLevel,
    pub message: String,
    /// Audit tag for entries produced by history actions, e.g. undo/redo.
    pub action: Option<ActionType>,
}

/// Capped list of operator-facing log lines. Undo and redo never touch it
/// beyond appending their own entries.
#[derive(Debug, Clone)]
pub struct LogChannel {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
    next_id: u64,
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOG_ENTRIES)
    }
}

impl LogChannel {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            next_id: 0,
        }
    }

    pub fn append(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        action: Option<ActionType>,
        timestamp_ms: u64,
    ) -> LogEntryId {
        self.next_id = self.next_id.wrapping_add(1);
        let id = LogEntryId(self.next_id);
        self.entries.push_back(LogEntry {
            id,
            timestamp_ms,
            level,
            message: message.into(),
            action,
        });
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        id
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn entries_at(&self, level: LogLevel) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |entry| entry.level == level)
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
