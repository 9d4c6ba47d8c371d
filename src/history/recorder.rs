use super::clock::{Clock, SystemClock};
use super::config::HistoryConfig;
use super::filter::{FilterEngine, FilterPatch, HistoryFilter};
use super::log_channel::{LogChannel, LogEntry, LogEntryId};
use super::record::{ActionType, HistoryError, HistoryEvent, HistoryRecord, LogLevel, RecordId};
use super::scheduler::{CoalesceKey, CoalescingScheduler, DuePayload, TimerHandle};
use super::store::{CursorMove, HistoryStats, RecordStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Committed(RecordId),
    Scheduled { key: CoalesceKey, handle: TimerHandle },
}

impl RecordOutcome {
    pub fn committed(&self) -> Option<RecordId> {
        match self {
            RecordOutcome::Committed(id) => Some(*id),
            RecordOutcome::Scheduled { .. } => None,
        }
    }
}

/// What a history panel renders: the filtered records plus cursor bounds for
/// enabling the undo/redo affordances.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView<'a> {
    pub records: Vec<&'a HistoryRecord>,
    pub cursor: Option<usize>,
    pub total: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Default coalescing key: one pending commit per distinct edit on a given
/// target. The description is part of the key, so two different properties
/// edited on the same target within the debounce window stay separate.
pub fn coalesce_key(event: &HistoryEvent) -> CoalesceKey {
    let target = event.target_id.as_deref().unwrap_or(&event.target_name);
    CoalesceKey::new(format!(
        "{}:{}:{}:{}",
        event.action_type, event.target_type, target, event.description
    ))
}

/// Session-owned entry point for recording edits, moving the undo cursor and
/// querying history for display.
///
/// Debounced edits are held until [`poll`](Self::poll) observes that their
/// delay has elapsed; hosts call it from their event or frame loop. Undo, redo
/// and immediate records flush pending edits first, so records keep the order
/// the edits were made in and the cursor only moves over committed records.
pub struct HistoryRecorder<C: Clock = SystemClock> {
    config: HistoryConfig,
    store: RecordStore,
    logs: LogChannel,
    scheduler: CoalescingScheduler<HistoryEvent>,
    filter: HistoryFilter,
    filter_engine: FilterEngine,
    clock: C,
}

impl HistoryRecorder<SystemClock> {
    pub fn new(config: HistoryConfig) -> Result<Self, HistoryError> {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for HistoryRecorder<SystemClock> {
    fn default() -> Self {
        Self::build(HistoryConfig::default(), SystemClock)
    }
}

impl<C: Clock> HistoryRecorder<C> {
    pub fn with_clock(config: HistoryConfig, clock: C) -> Result<Self, HistoryError> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: HistoryConfig, clock: C) -> Self {
        Self {
            store: RecordStore::new(config.max_records),
            logs: LogChannel::new(config.max_log_entries),
            scheduler: CoalescingScheduler::new(config.debounce_ms),
            filter: HistoryFilter::default(),
            filter_engine: FilterEngine::new(config.max_display_records),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn record(&mut self, event: HistoryEvent) -> Result<RecordOutcome, HistoryError> {
        self.record_with(event, true)
    }

    pub fn record_with(
        &mut self,
        event: HistoryEvent,
        debounce: bool,
    ) -> Result<RecordOutcome, HistoryError> {
        if debounce {
            let key = coalesce_key(&event);
            return self.record_keyed(key, event, None);
        }
        event.validate()?;
        // pending edits were made first and must land first
        self.flush_all();
        Ok(RecordOutcome::Committed(self.commit(event, 1)?))
    }

    /// Debounces `event` under an explicit key, optionally overriding the
    /// configured delay. A burst keeps the first `old_value` and the last of
    /// everything else, so the committed record spans the whole burst.
    pub fn record_keyed(
        &mut self,
        key: impl Into<CoalesceKey>,
        event: HistoryEvent,
        delay_ms: Option<u64>,
    ) -> Result<RecordOutcome, HistoryError> {
        event.validate()?;
        let key = key.into();
        let now = self.clock.now_ms();
        let delay = delay_ms.unwrap_or(self.config.debounce_ms);
        let handle =
            self.scheduler
                .schedule_merged(key.clone(), event, now, delay, |previous, mut next| {
                    if previous.old_value.is_some() {
                        next.old_value = previous.old_value;
                    }
                    next
                });
        log::debug!("[history] scheduled commit for {key} in {delay} ms");
        Ok(RecordOutcome::Scheduled { key, handle })
    }

    /// Commits every debounced edit whose delay has elapsed.
    pub fn poll(&mut self) -> Vec<RecordId> {
        let now = self.clock.now_ms();
        let due = self.scheduler.expire(now);
        self.commit_due(due)
    }

    pub fn flush(&mut self, key: &CoalesceKey) -> Option<RecordId> {
        let due = self.scheduler.flush(key)?;
        self.commit_due(vec![due]).pop()
    }

    pub fn flush_all(&mut self) -> Vec<RecordId> {
        let due = self.scheduler.flush_all();
        self.commit_due(due)
    }

    pub fn pending_commits(&self) -> usize {
        self.scheduler.pending_len()
    }

    pub fn is_pending(&self, key: &CoalesceKey) -> bool {
        self.scheduler.is_pending(key)
    }

    pub fn undo(&mut self) -> CursorMove {
        self.flush_all();
        let outcome = self.store.undo();
        match outcome {
            CursorMove::Undone(id) => self.log_cursor_move("Undo", ActionType::Undo, id),
            _ => log::debug!("[history] undo ignored: nothing to undo"),
        }
        outcome
    }

    pub fn redo(&mut self) -> CursorMove {
        self.flush_all();
        let outcome = self.store.redo();
        match outcome {
            CursorMove::Redone(id) => self.log_cursor_move("Redo", ActionType::Redo, id),
            _ => log::debug!("[history] redo ignored: nothing to redo"),
        }
        outcome
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.store.cursor()
    }

    pub fn jump_to(&self, id: RecordId) -> Option<&HistoryRecord> {
        self.store.jump_to(id)
    }

    pub fn records(&self) -> impl DoubleEndedIterator<Item = &HistoryRecord> + ExactSizeIterator {
        self.store.records()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn stats(&self) -> HistoryStats {
        self.store.stats()
    }

    pub fn filter(&self) -> &HistoryFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, patch: FilterPatch) {
        self.filter.apply(patch);
        if let Err(err) = self.filter.validate() {
            log::warn!("[history] {err}");
            self.push_log(
                LogLevel::Warn,
                format!("History filter matches nothing: {err}"),
                None,
            );
        }
    }

    pub fn reset_filter(&mut self) {
        self.filter = HistoryFilter::default();
    }

    pub fn view(&self) -> HistoryView<'_> {
        HistoryView {
            records: self.filter_engine.evaluate(self.store.records(), &self.filter),
            cursor: self.store.cursor(),
            total: self.store.len(),
            can_undo: self.store.can_undo(),
            can_redo: self.store.can_redo(),
        }
    }

    /// Drops all records and any edits still waiting on their debounce.
    pub fn clear_history(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        if cancelled > 0 {
            log::debug!("[history] cancelled {cancelled} pending commits on clear");
        }
        let removed = self.store.len();
        self.store.clear();
        self.push_log(
            LogLevel::Info,
            format!("History cleared ({removed} records)"),
            None,
        );
    }

    pub fn logs(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.logs.entries()
    }

    pub fn logs_at(&self, level: LogLevel) -> impl Iterator<Item = &LogEntry> {
        self.logs.entries_at(level)
    }

    pub fn log_message(&mut self, level: LogLevel, message: impl Into<String>) -> LogEntryId {
        self.push_log(level, message.into(), None)
    }

    pub fn clear_logs(&mut self) {
        self.logs.clear();
    }

    /// Commits every pending edit. Call before the session ends so the last
    /// in-flight edit is not lost.
    pub fn teardown(&mut self) -> Vec<RecordId> {
        let committed = self.flush_all();
        if !committed.is_empty() {
            log::info!(
                "[history] flushed {} pending commits on teardown",
                committed.len()
            );
        }
        committed
    }

    fn commit_due(&mut self, due: Vec<DuePayload<HistoryEvent>>) -> Vec<RecordId> {
        due.into_iter()
            .filter_map(|due| match self.commit(due.payload, due.coalesced) {
                Ok(id) => Some(id),
                Err(err) => {
                    log::error!("[history] failed to commit {}: {err}", due.key);
                    None
                }
            })
            .collect()
    }

    fn commit(&mut self, event: HistoryEvent, coalesced: u32) -> Result<RecordId, HistoryError> {
        let level = event.log_level.unwrap_or_default();
        let action = event.action_type;
        let mirrored = self
            .config
            .mirror_to_log
            .then(|| event.description.clone());

        let now = self.clock.now_ms();
        let outcome = self.store.append(event, now)?;
        log::debug!(
            "[history] committed record {} ({} edits coalesced, {} discarded, {} evicted)",
            outcome.id,
            coalesced,
            outcome.discarded,
            outcome.evicted
        );

        if let Some(message) = mirrored {
            self.push_log(level, message, Some(action));
        }
        Ok(outcome.id)
    }

    fn log_cursor_move(&mut self, verb: &str, action: ActionType, id: RecordId) {
        let description = self
            .store
            .jump_to(id)
            .map(|record| record.description.clone())
            .unwrap_or_default();
        self.push_log(LogLevel::Info, format!("{verb}: {description}"), Some(action));
    }

    fn push_log(
        &mut self,
        level: LogLevel,
        message: String,
        action: Option<ActionType>,
    ) -> LogEntryId {
        log::log!(log::Level::from(level), "[history] {message}");
        let now = self.clock.now_ms();
        self.logs.append(level, message, action, now)
    }
}

impl<C: Clock> Drop for HistoryRecorder<C> {
    fn drop(&mut self) {
        if !self.scheduler.is_idle() {
            log::warn!(
                "[history] recorder dropped with {} pending commits; call teardown() first",
                self.scheduler.pending_len()
            );
            self.scheduler.cancel_all();
        }
    }
}
