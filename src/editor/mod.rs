pub mod commands;

pub use commands::{PropertyEdit, RenameEdit, SceneNodeRef, Transform, TransformEdit};

use crate::history::{
    Clock, CoalesceKey, HistoryConfig, HistoryError, HistoryRecorder, RecordId, RecordOutcome,
    SystemClock,
};

/// One authoring session. Owns the session's history; panels borrow it
/// through [`SceneEditor::history`] / [`SceneEditor::history_mut`].
pub struct SceneEditor<C: Clock = SystemClock> {
    history: HistoryRecorder<C>,
}

impl SceneEditor<SystemClock> {
    pub fn new(config: HistoryConfig) -> Result<Self, HistoryError> {
        Ok(Self {
            history: HistoryRecorder::new(config)?,
        })
    }
}

impl<C: Clock> SceneEditor<C> {
    pub fn with_clock(config: HistoryConfig, clock: C) -> Result<Self, HistoryError> {
        Ok(Self {
            history: HistoryRecorder::with_clock(config, clock)?,
        })
    }

    pub fn history(&self) -> &HistoryRecorder<C> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryRecorder<C> {
        &mut self.history
    }

    /// Gizmo drags arrive every frame; they coalesce per node.
    pub fn transform(&mut self, edit: &TransformEdit) -> Result<RecordOutcome, HistoryError> {
        let event = edit.to_event()?;
        self.history.record(event)
    }

    pub fn rename(&mut self, edit: &RenameEdit) -> Result<RecordOutcome, HistoryError> {
        let event = edit.to_event()?;
        self.history.record_with(event, false)
    }

    pub fn set_property(&mut self, edit: &PropertyEdit) -> Result<RecordOutcome, HistoryError> {
        self.history
            .record_keyed(CoalesceKey::new(edit.coalesce_key()), edit.to_event(), None)
    }

    /// Per-frame hook: commits debounced edits whose delay has elapsed.
    pub fn tick(&mut self) -> Vec<RecordId> {
        self.history.poll()
    }

    /// Ends the session, committing any edit still waiting on its debounce.
    pub fn close(mut self) -> Vec<RecordId> {
        self.history.teardown()
    }
}
