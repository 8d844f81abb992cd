//! Runtime configuration. Every field has a default, so a config file only
//! needs the values it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::graph::GraphOptions;
use crate::validate::RelationshipPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {field} must be greater than zero")]
    Zero { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    /// Give up waiting for schema generation after this many seconds
    pub generation_timeout_secs: u64,
    /// Give up waiting for API materialization after this many seconds
    pub endpoint_timeout_secs: u64,
    pub dashboard_poll_secs: u64,
    pub page_size: usize,
    pub payment_max_attempts: u32,
    pub payment_backoff_secs: u64,
    pub graph: GraphOptions,
    pub relationship_policy: RelationshipPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            generation_timeout_secs: 20,
            endpoint_timeout_secs: 15,
            dashboard_poll_secs: 30,
            page_size: 6,
            payment_max_attempts: 3,
            payment_backoff_secs: 2,
            graph: GraphOptions::default(),
            relationship_policy: RelationshipPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Periods, timeouts and counts must be non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("generation_timeout_secs", self.generation_timeout_secs == 0),
            ("endpoint_timeout_secs", self.endpoint_timeout_secs == 0),
            ("dashboard_poll_secs", self.dashboard_poll_secs == 0),
            ("page_size", self.page_size == 0),
            ("payment_max_attempts", self.payment_max_attempts == 0),
        ];
        match checks.into_iter().find(|(_, zero)| *zero) {
            Some((field, _)) => Err(ConfigError::Zero { field }),
            None => Ok(()),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn endpoint_timeout(&self) -> Duration {
        Duration::from_secs(self.endpoint_timeout_secs)
    }

    pub fn dashboard_poll_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard_poll_secs)
    }

    pub fn payment_backoff(&self) -> Duration {
        Duration::from_secs(self.payment_backoff_secs)
    }
}
