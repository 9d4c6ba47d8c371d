//! Edit history and audit log for the scene editor.

pub mod clock;
pub mod config;
pub mod filter;
pub mod log_channel;
pub mod record;
pub mod recorder;
pub mod scheduler;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{HistoryConfig, HistoryConfigBuilder};
pub use filter::{FilterEngine, FilterPatch, HistoryFilter, TimeRange};
pub use log_channel::{LogChannel, LogEntry, LogEntryId};
pub use record::{
    ActionType, HistoryError, HistoryEvent, HistoryRecord, LogLevel, Metadata, Payload, RecordId,
    TargetType,
};
pub use recorder::{HistoryRecorder, HistoryView, RecordOutcome, coalesce_key};
pub use scheduler::{CoalesceKey, CoalescingScheduler, DuePayload, TimerHandle};
pub use store::{AppendOutcome, CursorMove, HistoryStats, RecordStore};
