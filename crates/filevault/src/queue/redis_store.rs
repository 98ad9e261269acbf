//! Redis-backed queue and result cache.
//!
//! Jobs live in a plain list: producers `RPUSH`, workers `BLPOP`, so the
//! list is FIFO across every worker attached to it. Cached results are
//! hashes written with `HSET`.

use std::time::Duration;

use redis::{aio::MultiplexedConnection, AsyncCommands, Client};

use super::QueueStore;
use crate::error::QueueError;

/// Configuration for the Redis store.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (`redis://` or `rediss://` for TLS).
    pub url: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl RedisStoreConfig {
    /// Create config with custom Redis URL
    pub fn with_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

/// Redis client owning two multiplexed connections.
///
/// `BLPOP` holds its connection until it returns, so it gets its own
/// connection and never stalls `RPUSH`/`HSET` issued by the same process.
pub struct RedisStore {
    connection: MultiplexedConnection,
    blocking: MultiplexedConnection,
}

impl RedisStore {
    /// Connects to Redis. Fails if the server cannot be reached.
    pub async fn connect(config: RedisStoreConfig) -> Result<Self, QueueError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            QueueError::ConnectionFailed {
                url: redacted_url(&config.url),
                reason: e.to_string(),
            }
        })?;

        let connection = Self::open_connection(&client, &config).await?;
        let blocking = Self::open_connection(&client, &config).await?;

        log::info!("Connected to Redis at {}", redacted_url(&config.url));

        Ok(Self {
            connection,
            blocking,
        })
    }

    async fn open_connection(
        client: &Client,
        config: &RedisStoreConfig,
    ) -> Result<MultiplexedConnection, QueueError> {
        client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::ConnectionFailed {
                url: redacted_url(&config.url),
                reason: e.to_string(),
            })
    }
}

#[async_trait::async_trait]
impl QueueStore for RedisStore {
    async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.connection.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    async fn push_right(&self, key: &str, value: &str) -> Result<(), QueueError> {
        let mut conn = self.connection.clone();
        conn.rpush::<_, _, i64>(key, value).await?;
        Ok(())
    }

    async fn blocking_pop_left(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<String>, QueueError> {
        let mut conn = self.blocking.clone();
        // BLPOP treats a zero timeout as "block forever".
        let timeout_secs = timeout.map(|t| t.as_secs_f64()).unwrap_or(0.0);

        let popped: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(key)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;

        Ok(popped.map(|(_, value)| value))
    }

    async fn hash_set(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), QueueError> {
        let mut conn = self.connection.clone();
        conn.hset_multiple::<_, _, _, ()>(key, fields).await?;
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, QueueError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn list_len(&self, key: &str) -> Result<u64, QueueError> {
        let mut conn = self.connection.clone();
        let len: u64 = conn.llen(key).await?;
        Ok(len)
    }
}

/// Strips credentials from a Redis URL before it is logged.
fn redacted_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}
