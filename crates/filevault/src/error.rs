use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilevaultError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Errors from the queue / result cache store.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to connect to Redis at '{url}': {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Failed to serialize/deserialize job: {0}")]
    Serialization(String),

    #[error("Invalid job descriptor: {0}")]
    InvalidJob(String),
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        QueueError::Redis(err.to_string())
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization(err.to_string())
    }
}

/// Errors raised while running the tagging step for one job.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Result store error for '{file_path}': {source}")]
    Store {
        file_path: String,
        #[source]
        source: crate::db::DatabaseError,
    },

    #[error("Result cache write failed for '{file_path}': {source}")]
    Cache {
        file_path: String,
        #[source]
        source: QueueError,
    },

    #[error("Processing '{file_path}' timed out after {after:?}")]
    Timeout { file_path: String, after: Duration },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker failed to start: {0}")]
    StartupFailed(String),

    #[error("Failed to receive from queue '{queue_key}': {source}")]
    Receive {
        queue_key: String,
        #[source]
        source: QueueError,
    },
}

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("New name is required")]
    EmptyName,

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub type Result<T> = std::result::Result<T, FilevaultError>;
