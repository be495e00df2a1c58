use std::time::Duration;

use anyhow::Result;

/// FIFO list shared by submitters and workers.
#[async_trait::async_trait]
pub trait JobQueue: Send + Sync {
    /// Appends to the tail.
    async fn push(&self, item: &str) -> Result<()>;

    /// Removes and returns the head, waiting without limit until one exists.
    async fn pop(&self) -> Result<String>;
}

/// Key/value storage with expiry, holding encoded outcomes.
#[async_trait::async_trait]
pub trait ResultStore: Clone + Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key` for `ttl`. Returns false if the key already
    /// holds a live value, which is left untouched.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;
}
