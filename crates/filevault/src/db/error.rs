//! Failures of the files database.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reading or writing file records.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database directory could not be created.
    #[error("Cannot create database directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema migration v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A stored row could not be decoded into a record.
    #[error("Corrupt row for file '{id}': {reason}")]
    Corrupt { id: String, reason: String },

    /// A thread panicked while holding the connection.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// A blocking database task was cancelled or panicked.
    #[error("Database task failed: {0}")]
    Task(String),
}
