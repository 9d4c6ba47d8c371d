use super::filter::DEFAULT_MAX_DISPLAY_RECORDS;
use super::log_channel::DEFAULT_MAX_LOG_ENTRIES;
use super::record::HistoryError;
use super::scheduler::DEFAULT_DEBOUNCE_MS;
use super::store::DEFAULT_MAX_RECORDS;
use serde::{Deserialize, Serialize};

/// Per-session settings for a [`HistoryRecorder`](super::HistoryRecorder).
///
/// Missing JSON fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_records: usize,
    pub max_log_entries: usize,
    pub max_display_records: usize,
    pub debounce_ms: u64,
    /// Mirror every committed record into the log channel.
    pub mirror_to_log: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            max_log_entries: DEFAULT_MAX_LOG_ENTRIES,
            max_display_records: DEFAULT_MAX_DISPLAY_RECORDS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            mirror_to_log: true,
        }
    }
}

impl HistoryConfig {
    pub fn builder() -> HistoryConfigBuilder {
        HistoryConfigBuilder::new()
    }

    pub fn from_json_str(json: &str) -> Result<Self, HistoryError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| HistoryError::ConfigParse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HistoryError> {
        if self.max_records == 0 {
            return Err(HistoryError::InvalidConfig(
                "max_records must be at least 1".into(),
            ));
        }
        if self.max_log_entries == 0 {
            return Err(HistoryError::InvalidConfig(
                "max_log_entries must be at least 1".into(),
            ));
        }
        if self.max_display_records == 0 {
            return Err(HistoryError::InvalidConfig(
                "max_display_records must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

pub struct HistoryConfigBuilder {
    config: HistoryConfig,
}

impl HistoryConfigBuilder {
    fn new() -> Self {
        Self {
            config: HistoryConfig::default(),
        }
    }

    pub fn max_records(mut self, max_records: usize) -> Self {
        self.config.max_records = max_records;
        self
    }

    pub fn max_log_entries(mut self, max_log_entries: usize) -> Self {
        self.config.max_log_entries = max_log_entries;
        self
    }

    pub fn max_display_records(mut self, max_display_records: usize) -> Self {
        self.config.max_display_records = max_display_records;
        self
    }

    pub fn debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.config.debounce_ms = debounce_ms;
        self
    }

    pub fn mirror_to_log(mut self, mirror: bool) -> Self {
        self.config.mirror_to_log = mirror;
        self
    }

    pub fn build(self) -> Result<HistoryConfig, HistoryError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            HistoryConfig::from_json_str(r#"{ "max_records": 20, "mirror_to_log": false }"#)
                .expect("parse config");
        assert_eq!(config.max_records, 20);
        assert!(!config.mirror_to_log);
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(config.max_display_records, DEFAULT_MAX_DISPLAY_RECORDS);
    }

    #[test]
    fn malformed_json_is_reported() {
        let result = HistoryConfig::from_json_str("{ max_records: }");
        assert!(matches!(result, Err(HistoryError::ConfigParse(_))));
    }

    #[test]
    fn zero_caps_are_rejected() {
        let result = HistoryConfig::builder().max_records(0).build();
        assert!(matches!(result, Err(HistoryError::InvalidConfig(_))));

        let result = HistoryConfig::from_json_str(r#"{ "max_display_records": 0 }"#);
        assert!(matches!(result, Err(HistoryError::InvalidConfig(_))));
    }

    #[test]
    fn builder_overrides_fields() {
        let config = HistoryConfig::builder()
            .max_records(5)
            .max_log_entries(7)
            .debounce_ms(50)
            .build()
            .expect("valid config");
        assert_eq!(config.max_records, 5);
        assert_eq!(config.max_log_entries, 7);
        assert_eq!(config.debounce_ms, 50);
        assert!(config.mirror_to_log);
    }
}
