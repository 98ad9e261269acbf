//! Queue and result-cache store.
//!
//! One key/value backend plays two roles: a FIFO work list (push right,
//! blocking pop left) and a hash cache of finished tagging results.

mod job;
mod memory;
mod redis_store;

pub use job::JobDescriptor;
pub use memory::MemoryQueueStore;
pub use redis_store::{RedisStore, RedisStoreConfig};

use std::time::Duration;

use crate::error::QueueError;

/// Default list key for pending tagging jobs.
pub const TAGGING_QUEUE_KEY: &str = "ai:tagging";

/// Hash field holding the JSON tag array in a cached result.
pub const TAGS_FIELD: &str = "tags";

/// Hash key of the cached tagging result for a file.
pub fn tagging_cache_key(file_id: &str) -> String {
    format!("file:{}:ai:tagging", file_id)
}

/// List and hash operations the enqueuer and worker depend on.
#[async_trait::async_trait]
pub trait QueueStore: Send + Sync {
    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), QueueError>;

    /// Appends `value` to the tail of the list at `key`.
    async fn push_right(&self, key: &str, value: &str) -> Result<(), QueueError>;

    /// Removes and returns the head of the list at `key`, waiting up to
    /// `timeout` for one to arrive. `None` waits indefinitely.
    async fn blocking_pop_left(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<String>, QueueError>;

    /// Sets the given fields on the hash at `key`.
    async fn hash_set(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), QueueError>;

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, QueueError>;

    async fn list_len(&self, key: &str) -> Result<u64, QueueError>;
}
