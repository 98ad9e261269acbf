use std::path::{Path, PathBuf};

use crate::config::schema::Settings;
use crate::error::ConfigError;

pub const ENV_DATABASE_PATH: &str = "FILEVAULT_DATABASE_PATH";
pub const ENV_REDIS_URL: &str = "REDIS_URL";
pub const ENV_QUEUE_KEY: &str = "FILEVAULT_QUEUE_KEY";
pub const ENV_POLL_INTERVAL: &str = "FILEVAULT_POLL_INTERVAL_SECS";

/// Loads settings from a JSON file, then applies environment overrides.
///
/// With no path, starts from the defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
                path: path.to_path_buf(),
                source: e,
            })?;
            parse_settings(&content)?
        }
        None => Settings::default(),
    };

    apply_env_overrides(&mut settings)?;
    validate_settings(&settings)?;

    Ok(settings)
}

/// Parses and validates settings without consulting the environment.
pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    let settings = parse_settings(content)?;
    validate_settings(&settings)?;
    Ok(settings)
}

fn parse_settings(content: &str) -> Result<Settings, ConfigError> {
    Ok(serde_json::from_str(content)?)
}

pub fn apply_env_overrides(settings: &mut Settings) -> Result<(), ConfigError> {
    if let Some(path) = non_empty_env(ENV_DATABASE_PATH) {
        settings.database_path = Some(PathBuf::from(path));
    }
    if let Some(url) = non_empty_env(ENV_REDIS_URL) {
        settings.redis_url = url;
    }
    if let Some(key) = non_empty_env(ENV_QUEUE_KEY) {
        settings.queue_key = key;
    }
    if let Some(value) = non_empty_env(ENV_POLL_INTERVAL) {
        settings.poll_interval_secs =
            value.parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_POLL_INTERVAL,
                value,
            })?;
    }
    Ok(())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.queue_key.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "queue_key must not be empty".to_string(),
        });
    }

    if settings.poll_interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "poll_interval_secs must be greater than zero".to_string(),
        });
    }

    if settings.processing_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "processing_timeout_secs must be greater than zero".to_string(),
        });
    }

    if settings.simulated_latency() >= settings.processing_timeout() {
        return Err(ConfigError::Validation {
            message: format!(
                "simulated_latency_ms ({}) must be below processing_timeout_secs ({})",
                settings.simulated_latency_ms, settings.processing_timeout_secs
            ),
        });
    }

    if !settings.redis_url.starts_with("redis://") && !settings.redis_url.starts_with("rediss://")
    {
        return Err(ConfigError::Validation {
            message: "redis_url must start with redis:// or rediss://".to_string(),
        });
    }

    Ok(())
}
