//! In-process queue store with the same list/hash semantics as Redis.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use super::QueueStore;
use crate::error::QueueError;

#[derive(Default)]
struct State {
    lists: HashMap<String, VecDeque<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
}

/// Queue store held entirely in memory.
///
/// Pops are atomic under a single mutex, so several workers may share
/// one instance. `close` simulates a dropped connection: every later
/// call fails and blocked pops wake up with an error.
#[derive(Default)]
pub struct MemoryQueueStore {
    state: Mutex<State>,
    pushed: Notify,
    closed: AtomicBool,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.pushed.notify_waiters();
    }

    /// Current contents of a list, head first.
    pub fn list_snapshot(&self, key: &str) -> Vec<String> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.lists.get(key).map(|l| l.iter().cloned().collect()))
            .unwrap_or_default()
    }

    /// Current contents of a hash, if it exists.
    pub fn hash_snapshot(&self, key: &str) -> Option<HashMap<String, String>> {
        self.state.lock().ok()?.hashes.get(key).cloned()
    }

    fn check_open(&self) -> Result<(), QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::ConnectionFailed {
                url: "memory://".to_string(),
                reason: "store closed".to_string(),
            });
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, QueueError> {
        self.state
            .lock()
            .map_err(|_| QueueError::Redis("memory store lock poisoned".to_string()))
    }

    fn try_pop(&self, key: &str) -> Result<Option<String>, QueueError> {
        let mut state = self.lock()?;
        Ok(state.lists.get_mut(key).and_then(|list| list.pop_front()))
    }
}

#[async_trait::async_trait]
impl QueueStore for MemoryQueueStore {
    async fn ping(&self) -> Result<(), QueueError> {
        self.check_open()
    }

    async fn push_right(&self, key: &str, value: &str) -> Result<(), QueueError> {
        self.check_open()?;
        self.lock()?
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn blocking_pop_left(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<String>, QueueError> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            // Register interest before checking so a push in between is not missed.
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            self.check_open()?;
            if let Some(value) = self.try_pop(key)? {
                return Ok(Some(value));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn hash_set(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), QueueError> {
        self.check_open()?;
        let mut state = self.lock()?;
        let hash = state.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, QueueError> {
        self.check_open()?;
        let state = self.lock()?;
        Ok(state.hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    async fn list_len(&self, key: &str) -> Result<u64, QueueError> {
        self.check_open()?;
        let state = self.lock()?;
        Ok(state.lists.get(key).map(|l| l.len() as u64).unwrap_or(0))
    }
}
