use std::time::Duration;

use anyhow::{Context, Result};
use redis::{aio::MultiplexedConnection, Client};

use crate::domain::repository::{JobQueue, ResultStore};

/// Queue backed by a Redis list: `LPUSH` to submit, `BRPOP` to consume.
///
/// `BRPOP` parks the whole connection it runs on, so every consumer must own
/// its queue instance; see [`RedisJobQueue::connect`].
#[derive(Clone)]
pub struct RedisJobQueue {
    conn: MultiplexedConnection,
    name: String,
}

impl RedisJobQueue {
    /// Opens a dedicated connection for this queue handle.
    pub async fn connect(client: &Client, name: impl Into<String>) -> Result<Self> {
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .context("RedisJobQueue::connect")?;

        Ok(Self::new(conn, name))
    }

    /// Wraps an existing connection. Fine for push-only handles; a consumer
    /// sharing it would block every other command while waiting in `pop`.
    pub fn new(conn: MultiplexedConnection, name: impl Into<String>) -> Self {
        Self {
            conn,
            name: name.into(),
        }
    }
}

#[async_trait::async_trait]
impl JobQueue for RedisJobQueue {
    async fn push(&self, item: &str) -> Result<()> {
        let mut conn = self.conn.clone();

        redis::cmd("LPUSH")
            .arg(&self.name)
            .arg(item)
            .query_async::<_, i64>(&mut conn)
            .await
            .context("RedisJobQueue::push")?;

        Ok(())
    }

    async fn pop(&self) -> Result<String> {
        let mut conn = self.conn.clone();

        loop {
            // A zero timeout blocks until an element arrives.
            let popped: Option<(String, String)> = redis::cmd("BRPOP")
                .arg(&self.name)
                .arg(0)
                .query_async(&mut conn)
                .await
                .context("RedisJobQueue::pop")?;

            if let Some((_, item)) = popped {
                return Ok(item);
            }
        }
    }
}

/// Result mailbox backed by Redis string keys with expiry.
#[derive(Clone)]
pub struct RedisResultStore {
    conn: MultiplexedConnection,
}

impl RedisResultStore {
    pub async fn connect(client: &Client) -> Result<Self> {
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .context("RedisResultStore::connect")?;

        Ok(Self::new(conn))
    }

    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl ResultStore for RedisResultStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();

        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .context("RedisResultStore::get")?;

        Ok(value)
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(expiry_seconds(ttl))
            .arg("NX")
            .query_async(&mut conn)
            .await
            .context("RedisResultStore::put")?;

        Ok(reply.is_some())
    }
}

/// `EX` takes whole seconds and rejects zero, so partial seconds round up.
fn expiry_seconds(ttl: Duration) -> u64 {
    let seconds = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);

    seconds.max(1)
}
