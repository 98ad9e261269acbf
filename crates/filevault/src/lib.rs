pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod queue;
pub mod record;
pub mod store;
pub mod worker;

pub use config::{load_settings, Settings};
pub use db::{Database, DatabaseError};
pub use error::{
    ConfigError, FilevaultError, LibraryError, ProcessError, QueueError, Result, WorkerError,
};
pub use library::{FileLibrary, NewUpload, TagStatus, UploadReceipt};
pub use queue::{JobDescriptor, MemoryQueueStore, QueueStore, RedisStore, RedisStoreConfig};
pub use record::{FileRecord, TaggingStatus};
pub use store::{MemoryResultStore, ResultStore, SqliteResultStore};
pub use worker::{
    EnqueueOutcome, JobEnqueuer, JobWorker, ProcessOutcome, TaggingProcessor, WorkerConfig,
    WorkerState, WorkerStats,
};
