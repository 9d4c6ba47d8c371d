use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Delete,
    Modify,
    Transform,
    Material,
    Lighting,
    Camera,
    Scene,
    Import,
    Export,
    Undo,
    Redo,
}

impl ActionType {
    pub const ALL: [ActionType; 12] = [
        ActionType::Create,
        ActionType::Delete,
        ActionType::Modify,
        ActionType::Transform,
        ActionType::Material,
        ActionType::Lighting,
        ActionType::Camera,
        ActionType::Scene,
        ActionType::Import,
        ActionType::Export,
        ActionType::Undo,
        ActionType::Redo,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ActionType::Create => "create",
            ActionType::Delete => "delete",
            ActionType::Modify => "modify",
            ActionType::Transform => "transform",
            ActionType::Material => "material",
            ActionType::Lighting => "lighting",
            ActionType::Camera => "camera",
            ActionType::Scene => "scene",
            ActionType::Import => "import",
            ActionType::Export => "export",
            ActionType::Undo => "undo",
            ActionType::Redo => "redo",
        }
    }

    /// Undo and redo only ever appear as log tags, never as stored edits.
    pub fn is_meta(self) -> bool {
        matches!(self, ActionType::Undo | ActionType::Redo)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Object,
    Mesh,
    Light,
    Camera,
    Material,
    Texture,
    Geometry,
    Group,
    Scene,
    Asset,
    Environment,
    Other,
}

impl TargetType {
    pub fn label(self) -> &'static str {
        match self {
            TargetType::Object => "object",
            TargetType::Mesh => "mesh",
            TargetType::Light => "light",
            TargetType::Camera => "camera",
            TargetType::Material => "material",
            TargetType::Texture => "texture",
            TargetType::Geometry => "geometry",
            TargetType::Group => "group",
            TargetType::Scene => "scene",
            TargetType::Asset => "asset",
            TargetType::Environment => "environment",
            TargetType::Other => "other",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Before/after state attached to a record.
///
/// The history engine stores and hands back payloads verbatim. Only callers
/// encode or decode them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(serde_json::Value);

impl Payload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self, HistoryError> {
        serde_json::to_value(value)
            .map(Self)
            .map_err(|err| HistoryError::PayloadEncoding(err.to_string()))
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, HistoryError> {
        serde_json::from_value(self.0.clone())
            .map_err(|err| HistoryError::PayloadEncoding(err.to_string()))
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

pub type Metadata = BTreeMap<String, serde_json::Value>;

/// An edit reported by an editor call site, before the store assigns it an
/// id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub action_type: ActionType,
    pub target_type: TargetType,
    pub target_id: Option<String>,
    pub target_name: String,
    pub description: String,
    pub old_value: Option<Payload>,
    pub new_value: Option<Payload>,
    pub log_level: Option<LogLevel>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl HistoryEvent {
    pub fn new(
        action_type: ActionType,
        target_type: TargetType,
        target_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target_type,
            target_id: None,
            target_name: target_name.into(),
            description: description.into(),
            old_value: None,
            new_value: None,
            log_level: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_target_id(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_values(mut self, old_value: Option<Payload>, new_value: Option<Payload>) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    pub fn with_old_value(mut self, value: impl Into<Payload>) -> Self {
        self.old_value = Some(value.into());
        self
    }

    pub fn with_new_value(mut self, value: impl Into<Payload>) -> Self {
        self.new_value = Some(value.into());
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Rejects events the store must never hold: blank required text and
    /// the undo/redo meta tags.
    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.action_type.is_meta() {
            return Err(HistoryError::ReservedActionType(self.action_type));
        }
        if self.target_name.trim().is_empty() {
            return Err(HistoryError::MissingField("target_name"));
        }
        if self.description.trim().is_empty() {
            return Err(HistoryError::MissingField("description"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: RecordId,
    pub timestamp_ms: u64,
    pub action_type: ActionType,
    pub target_type: TargetType,
    pub target_id: Option<String>,
    pub target_name: String,
    pub description: String,
    pub old_value: Option<Payload>,
    pub new_value: Option<Payload>,
    pub is_undone: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

impl HistoryRecord {
    pub(crate) fn from_event(id: RecordId, timestamp_ms: u64, event: HistoryEvent) -> Self {
        Self {
            id,
            timestamp_ms,
            action_type: event.action_type,
            target_type: event.target_type,
            target_id: event.target_id,
            target_name: event.target_name,
            description: event.description,
            old_value: event.old_value,
            new_value: event.new_value,
            is_undone: false,
            metadata: event.metadata,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history event is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("`{0}` is reserved for log entries and cannot be recorded as an edit")]
    ReservedActionType(ActionType),
    #[error("filter time range is inverted: start {start_ms} > end {end_ms}")]
    InvalidFilterRange { start_ms: u64, end_ms: u64 },
    #[error("invalid history configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse history configuration: {0}")]
    ConfigParse(String),
    #[error("payload encoding failed: {0}")]
    PayloadEncoding(String),
}
