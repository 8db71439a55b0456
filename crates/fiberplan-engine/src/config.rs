//! Engine configuration.

use std::path::Path;
use std::time::Duration;

use fiberplan_types::LossModel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Diagram store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Quiet period before an autosave commit, in milliseconds
    pub autosave_delay_ms: u64,

    /// Owner recorded on diagrams created by this session
    pub user_id: Option<String>,

    /// Prefix of generated diagram names ("Diagram 1", "Diagram 2", ...)
    pub default_name_prefix: String,
}

impl StoreConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Fallback cache key for the configured user
    pub fn cache_key(&self) -> String {
        match &self.user_id {
            Some(user) => format!("fiberplan-diagrams-{}", user),
            None => "fiberplan-diagrams".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: 500,
            user_id: None,
            default_name_prefix: "Diagram".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub loss_model: LossModel,
    pub store: StoreConfig,
}

impl EngineConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
