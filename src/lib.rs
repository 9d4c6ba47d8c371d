pub mod editor;
pub mod history;

pub use history::{
    ActionType, HistoryConfig, HistoryError, HistoryEvent, HistoryRecord, HistoryRecorder,
    LogLevel, TargetType,
};
