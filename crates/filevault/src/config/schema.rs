use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::db::default_database_path;
use crate::error::ConfigError;
use crate::queue::{RedisStoreConfig, TAGGING_QUEUE_KEY};
use crate::worker::WorkerConfig;

/// Runtime settings shared by the worker and the enqueue side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite file holding file records. Defaults to
    /// `~/.filevault/data/filevault.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_queue_key")]
    pub queue_key: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_processing_timeout_secs")]
    pub processing_timeout_secs: u64,
    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,
    /// Public origin used to build share links.
    #[serde(default = "default_share_base_url")]
    pub share_base_url: String,
}

fn default_redis_url() -> String {
    RedisStoreConfig::default().url
}

fn default_queue_key() -> String {
    TAGGING_QUEUE_KEY.to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_processing_timeout_secs() -> u64 {
    30
}

fn default_simulated_latency_ms() -> u64 {
    2000
}

fn default_share_base_url() -> String {
    "http://localhost:5000".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            redis_url: default_redis_url(),
            queue_key: default_queue_key(),
            poll_interval_secs: default_poll_interval_secs(),
            processing_timeout_secs: default_processing_timeout_secs(),
            simulated_latency_ms: default_simulated_latency_ms(),
            share_base_url: default_share_base_url(),
        }
    }
}

impl Settings {
    /// Database path, falling back to the per-user default.
    pub fn resolved_database_path(&self) -> Result<PathBuf, ConfigError> {
        self.database_path
            .clone()
            .or_else(default_database_path)
            .ok_or_else(|| ConfigError::Validation {
                message: "No database path configured and home directory is unknown"
                    .to_string(),
            })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    pub fn redis_config(&self) -> RedisStoreConfig {
        RedisStoreConfig::with_url(&self.redis_url)
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            queue_key: self.queue_key.clone(),
            poll_interval: self.poll_interval(),
            processing_timeout: self.processing_timeout(),
            simulated_latency: self.simulated_latency(),
            ..Default::default()
        }
    }
}
