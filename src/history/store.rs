//! Ordered edit log with an undo/redo cursor.

use super::record::{ActionType, HistoryError, HistoryEvent, HistoryRecord, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

pub const DEFAULT_MAX_RECORDS: usize = 100;

/// Result of moving the cursor. The no-op variants are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Undone(RecordId),
    Redone(RecordId),
    NoHistory,
    NoFuture,
}

impl CursorMove {
    pub fn moved(&self) -> Option<RecordId> {
        match self {
            CursorMove::Undone(id) | CursorMove::Redone(id) => Some(*id),
            CursorMove::NoHistory | CursorMove::NoFuture => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.moved().is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub id: RecordId,
    /// Undone records dropped because the cursor was behind the tip.
    pub discarded: usize,
    /// Oldest records dropped to respect the retention cap.
    pub evicted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total: usize,
    pub undone: usize,
    pub by_action: BTreeMap<ActionType, usize>,
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    records: VecDeque<HistoryRecord>,
    applied: usize,
    max_records: usize,
    next_id: u64,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORDS)
    }
}

impl RecordStore {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: VecDeque::new(),
            applied: 0,
            max_records: max_records.max(1),
            next_id: 0,
        }
    }

    /// Stores `event` as the newest record. Events failing
    /// [`HistoryEvent::validate`] are rejected and leave the store untouched.
    pub fn append(
        &mut self,
        event: HistoryEvent,
        timestamp_ms: u64,
    ) -> Result<AppendOutcome, HistoryError> {
        event.validate()?;
        let discarded = self.records.len() - self.applied;
        if discarded > 0 {
            self.records.truncate(self.applied);
        }

        self.next_id = self.next_id.wrapping_add(1);
        let id = RecordId(self.next_id);
        self.records
            .push_back(HistoryRecord::from_event(id, timestamp_ms, event));
        self.applied = self.records.len();

        let evicted = self.enforce_cap();
        Ok(AppendOutcome {
            id,
            discarded,
            evicted,
        })
    }

    pub fn undo(&mut self) -> CursorMove {
        if self.applied == 0 {
            return CursorMove::NoHistory;
        }
        self.applied -= 1;
        let record = &mut self.records[self.applied];
        record.is_undone = true;
        CursorMove::Undone(record.id)
    }

    pub fn redo(&mut self) -> CursorMove {
        if self.applied >= self.records.len() {
            return CursorMove::NoFuture;
        }
        let record = &mut self.records[self.applied];
        record.is_undone = false;
        self.applied += 1;
        CursorMove::Redone(record.id)
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.applied = 0;
    }

    /// Looks a record up by id without moving the cursor.
    pub fn jump_to(&self, id: RecordId) -> Option<&HistoryRecord> {
        self.position_of(id).map(|index| &self.records[index])
    }

    pub fn position_of(&self, id: RecordId) -> Option<usize> {
        // Ids are assigned in ascending order, so storage is sorted by id.
        self.records
            .binary_search_by(|record| record.id.cmp(&id))
            .ok()
    }

    /// Index of the most recently applied record, `None` when everything has
    /// been undone or the store is empty.
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn current(&self) -> Option<&HistoryRecord> {
        self.cursor().map(|index| &self.records[index])
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Changes the retention cap, evicting from the head right away if the
    /// store is already over it. Returns the number of evicted records.
    pub fn set_max_records(&mut self, max_records: usize) -> usize {
        self.max_records = max_records.max(1);
        self.enforce_cap()
    }

    pub fn records(&self) -> impl DoubleEndedIterator<Item = &HistoryRecord> + ExactSizeIterator {
        self.records.iter()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryRecord> {
        self.records.get(index)
    }

    /// Descriptions of undoable records, most recent first.
    pub fn undo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .take(self.applied)
            .rev()
            .map(|record| record.description.as_str())
    }

    /// Descriptions of redoable records, next redo first.
    pub fn redo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .skip(self.applied)
            .map(|record| record.description.as_str())
    }

    pub fn records_for_target<'a>(
        &'a self,
        target_id: &'a str,
    ) -> impl Iterator<Item = &'a HistoryRecord> + 'a {
        self.records
            .iter()
            .filter(move |record| record.target_id.as_deref() == Some(target_id))
    }

    pub fn stats(&self) -> HistoryStats {
        let mut stats = HistoryStats {
            total: self.records.len(),
            ..HistoryStats::default()
        };
        for record in &self.records {
            if record.is_undone {
                stats.undone += 1;
            }
            *stats.by_action.entry(record.action_type).or_insert(0) += 1;
        }
        stats
    }

    fn enforce_cap(&mut self) -> usize {
        let overflow = self.records.len().saturating_sub(self.max_records);
        if overflow == 0 {
            return 0;
        }
        self.records.drain(..overflow);
        self.applied = self.applied.saturating_sub(overflow);
        overflow
    }
}
