//! Read-only queries over the record store for the history panel.

use super::record::{ActionType, HistoryError, HistoryRecord, TargetType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_MAX_DISPLAY_RECORDS: usize = 50;

/// Inclusive range of creation timestamps, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimeRange {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn is_inverted(&self) -> bool {
        self.start_ms > self.end_ms
    }

    pub fn contains(&self, timestamp_ms: u64) -> bool {
        self.start_ms <= timestamp_ms && timestamp_ms <= self.end_ms
    }
}

/// Empty categories place no constraint on the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryFilter {
    pub action_types: BTreeSet<ActionType>,
    pub target_types: BTreeSet<TargetType>,
    pub time_range: Option<TimeRange>,
    pub search_text: String,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action_types(mut self, types: impl IntoIterator<Item = ActionType>) -> Self {
        self.action_types = types.into_iter().collect();
        self
    }

    pub fn with_target_types(mut self, types: impl IntoIterator<Item = TargetType>) -> Self {
        self.target_types = types.into_iter().collect();
        self
    }

    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.action_types.is_empty()
            && self.target_types.is_empty()
            && self.time_range.is_none()
            && self.search_text.is_empty()
    }

    pub fn validate(&self) -> Result<(), HistoryError> {
        match self.time_range {
            Some(range) if range.is_inverted() => Err(HistoryError::InvalidFilterRange {
                start_ms: range.start_ms,
                end_ms: range.end_ms,
            }),
            _ => Ok(()),
        }
    }

    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(action_types) = patch.action_types {
            self.action_types = action_types;
        }
        if let Some(target_types) = patch.target_types {
            self.target_types = target_types;
        }
        if let Some(time_range) = patch.time_range {
            self.time_range = time_range;
        }
        if let Some(search_text) = patch.search_text {
            self.search_text = search_text;
        }
    }
}

/// Partial filter update; `None` leaves a category untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPatch {
    pub action_types: Option<BTreeSet<ActionType>>,
    pub target_types: Option<BTreeSet<TargetType>>,
    /// `Some(None)` clears the range.
    pub time_range: Option<Option<TimeRange>>,
    pub search_text: Option<String>,
}

impl FilterPatch {
    pub fn action_types(mut self, types: impl IntoIterator<Item = ActionType>) -> Self {
        self.action_types = Some(types.into_iter().collect());
        self
    }

    pub fn target_types(mut self, types: impl IntoIterator<Item = TargetType>) -> Self {
        self.target_types = Some(types.into_iter().collect());
        self
    }

    pub fn time_range(mut self, range: Option<TimeRange>) -> Self {
        self.time_range = Some(range);
        self
    }

    pub fn search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterEngine {
    max_display_records: usize,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DISPLAY_RECORDS)
    }
}

impl FilterEngine {
    pub fn new(max_display_records: usize) -> Self {
        Self {
            max_display_records,
        }
    }

    pub fn max_display_records(&self) -> usize {
        self.max_display_records
    }

    /// Selects the records matching `filter`, most recent first, capped at
    /// `max_display_records`. Records must be given in storage order; equal
    /// timestamps are ordered by storage position, later first.
    pub fn evaluate<'a, I>(&self, records: I, filter: &HistoryFilter) -> Vec<&'a HistoryRecord>
    where
        I: IntoIterator<Item = &'a HistoryRecord>,
    {
        if filter.time_range.is_some_and(|range| range.is_inverted()) {
            return Vec::new();
        }

        let needle = filter.search_text.to_lowercase();
        let mut matched: Vec<(usize, &'a HistoryRecord)> = records
            .into_iter()
            .enumerate()
            .filter(|(_, record)| record_matches(record, filter, &needle))
            .collect();

        matched.sort_by(|(a_pos, a), (b_pos, b)| {
            b.timestamp_ms
                .cmp(&a.timestamp_ms)
                .then_with(|| b_pos.cmp(a_pos))
        });
        matched.truncate(self.max_display_records);
        matched.into_iter().map(|(_, record)| record).collect()
    }
}

fn record_matches(record: &HistoryRecord, filter: &HistoryFilter, needle: &str) -> bool {
    if !filter.action_types.is_empty() && !filter.action_types.contains(&record.action_type) {
        return false;
    }
    if !filter.target_types.is_empty() && !filter.target_types.contains(&record.target_type) {
        return false;
    }
    if let Some(range) = filter.time_range {
        if !range.contains(record.timestamp_ms) {
            return false;
        }
    }
    if needle.is_empty() {
        return true;
    }
    record.description.to_lowercase().contains(needle)
        || record.target_name.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::record::{HistoryEvent, RecordId};

    fn record(
        id: u64,
        timestamp_ms: u64,
        action_type: ActionType,
        target_type: TargetType,
        name: &str,
        description: &str,
    ) -> HistoryRecord {
        HistoryRecord::from_event(
            RecordId(id),
            timestamp_ms,
            HistoryEvent::new(action_type, target_type, name, description),
        )
    }

    fn sample() -> Vec<HistoryRecord> {
        vec![
            record(1, 100, ActionType::Create, TargetType::Mesh, "Cube", "alpha"),
            record(2, 200, ActionType::Modify, TargetType::Light, "Sun", "beta"),
            record(3, 300, ActionType::Material, TargetType::Material, "Steel", "Tint metal"),
            record(4, 400, ActionType::Transform, TargetType::Mesh, "Cube", "Move Cube"),
        ]
    }

    fn ids(records: &[&HistoryRecord]) -> Vec<u64> {
        records.iter().map(|record| record.id.0).collect()
    }

    #[test]
    fn search_matches_description_substring() {
        let records = vec![
            record(1, 10, ActionType::Modify, TargetType::Object, "One", "alpha"),
            record(2, 20, ActionType::Modify, TargetType::Object, "Two", "beta"),
        ];
        let filter = HistoryFilter::new().with_search_text("al");
        let view = FilterEngine::new(10).evaluate(&records, &filter);
        assert_eq!(ids(&view), vec![1]);
    }

    #[test]
    fn search_is_case_insensitive_over_name_or_description() {
        let records = sample();
        let engine = FilterEngine::new(10);

        let by_name = engine.evaluate(&records, &HistoryFilter::new().with_search_text("STEEL"));
        assert_eq!(ids(&by_name), vec![3]);

        let either = engine.evaluate(&records, &HistoryFilter::new().with_search_text("cube"));
        assert_eq!(ids(&either), vec![4, 1]);
    }

    #[test]
    fn categories_combine_with_and() {
        let records = sample();
        let filter = HistoryFilter::new()
            .with_target_types([TargetType::Mesh])
            .with_action_types([ActionType::Transform, ActionType::Modify]);
        let view = FilterEngine::new(10).evaluate(&records, &filter);
        assert_eq!(ids(&view), vec![4]);
    }

    #[test]
    fn time_range_is_inclusive() {
        let records = sample();
        let filter = HistoryFilter::new().with_time_range(TimeRange::new(200, 300));
        let view = FilterEngine::new(10).evaluate(&records, &filter);
        assert_eq!(ids(&view), vec![3, 2]);
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let records = sample();
        let filter = HistoryFilter::new().with_time_range(TimeRange::new(400, 100));
        assert!(FilterEngine::new(10).evaluate(&records, &filter).is_empty());
        assert_eq!(
            filter.validate(),
            Err(HistoryError::InvalidFilterRange {
                start_ms: 400,
                end_ms: 100
            })
        );
    }

    #[test]
    fn sorts_newest_first_and_caps() {
        let mut records = sample();
        // storage order is not timestamp order after a clock adjustment
        records[0].timestamp_ms = 900;
        let engine = FilterEngine::new(2);
        let view = engine.evaluate(&records, &HistoryFilter::new());
        assert_eq!(ids(&view), vec![1, 4]);
    }

    #[test]
    fn equal_timestamps_prefer_later_storage() {
        let records = vec![
            record(1, 50, ActionType::Modify, TargetType::Object, "A", "first"),
            record(2, 50, ActionType::Modify, TargetType::Object, "B", "second"),
        ];
        let view = FilterEngine::new(10).evaluate(&records, &HistoryFilter::new());
        assert_eq!(ids(&view), vec![2, 1]);
    }

    #[test]
    fn evaluation_is_deterministic_and_pure() {
        let records = sample();
        let snapshot = records.clone();
        let filter = HistoryFilter::new().with_search_text("e");
        let engine = FilterEngine::new(3);
        let first = engine.evaluate(&records, &filter);
        let second = engine.evaluate(&records, &filter);
        assert_eq!(first, second);
        assert_eq!(records, snapshot);
    }

    #[test]
    fn patch_replaces_only_given_categories() {
        let mut filter = HistoryFilter::new()
            .with_search_text("cube")
            .with_time_range(TimeRange::new(0, 10));
        filter.apply(FilterPatch::default().action_types([ActionType::Delete]));
        assert_eq!(filter.search_text, "cube");
        assert!(filter.action_types.contains(&ActionType::Delete));

        filter.apply(FilterPatch::default().time_range(None).search_text(""));
        assert!(filter.time_range.is_none());
        assert!(!filter.is_empty());
        filter.apply(FilterPatch::default().action_types([]));
        assert!(filter.is_empty());
    }
}
