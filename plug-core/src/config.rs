//! Configuration
//!
//! Settings are plain structs with sensible defaults. They can be built in
//! code or loaded from JSON; missing fields take their default.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings for an [`ActionLog`](crate::action::ActionLog).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undo steps kept. The oldest steps are dropped
    /// first. `0` keeps every step.
    pub max_undo_steps: usize,

    /// When `false`, enacted actions still run but nothing is recorded.
    pub record_history: bool,
}

impl HistoryConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_max_undo_steps(mut self, steps: usize) -> Self {
        self.max_undo_steps = steps;
        self
    }

    pub fn with_record_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_undo_steps: 0,
            record_history: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlugError;

    #[test]
    fn missing_fields_take_defaults() {
        let config = HistoryConfig::from_json_str(r#"{ "max_undo_steps": 50 }"#).unwrap();
        assert_eq!(config.max_undo_steps, 50);
        assert!(config.record_history);

        assert_eq!(HistoryConfig::from_json_str("{}").unwrap(), HistoryConfig::default());
    }

    #[test]
    fn survives_a_json_round_trip() {
        let config = HistoryConfig::default()
            .with_max_undo_steps(8)
            .with_record_history(false);
        let json = config.to_json_string().unwrap();
        assert_eq!(HistoryConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = HistoryConfig::from_json_str(r#"{ "max_undo_steps": -1 }"#).unwrap_err();
        assert!(matches!(err, PlugError::Config(_)));
    }
}
