use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{anyhow, Result};
use tokio::{sync::Notify, time::Instant};

use crate::domain::repository::{JobQueue, ResultStore};

/// In-process queue and result store with the same semantics as the Redis
/// adapters. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    queue: Mutex<VecDeque<String>>,
    available: Notify,
    results: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued items not yet popped.
    pub fn queue_len(&self) -> Result<usize> {
        let queue = self
            .inner
            .queue
            .lock()
            .map_err(|_| anyhow!("MemoryStore queue lock poisoned"))?;

        Ok(queue.len())
    }

    /// Number of result entries held, including expired ones not yet swept.
    pub fn results_len(&self) -> Result<usize> {
        let results = self
            .inner
            .results
            .lock()
            .map_err(|_| anyhow!("MemoryStore results lock poisoned"))?;

        Ok(results.len())
    }

    fn try_pop(&self) -> Result<Option<String>> {
        let mut queue = self
            .inner
            .queue
            .lock()
            .map_err(|_| anyhow!("MemoryStore queue lock poisoned"))?;

        Ok(queue.pop_back())
    }
}

#[async_trait::async_trait]
impl JobQueue for MemoryStore {
    async fn push(&self, item: &str) -> Result<()> {
        {
            let mut queue = self
                .inner
                .queue
                .lock()
                .map_err(|_| anyhow!("MemoryStore queue lock poisoned"))?;
            queue.push_front(item.to_string());
        }

        self.inner.available.notify_one();

        Ok(())
    }

    async fn pop(&self) -> Result<String> {
        loop {
            let notified = self.inner.available.notified();

            if let Some(item) = self.try_pop()? {
                return Ok(item);
            }

            notified.await;
        }
    }
}

#[async_trait::async_trait]
impl ResultStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut results = self
            .inner
            .results
            .lock()
            .map_err(|_| anyhow!("MemoryStore results lock poisoned"))?;

        let now = Instant::now();
        match results.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                results.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut results = self
            .inner
            .results
            .lock()
            .map_err(|_| anyhow!("MemoryStore results lock poisoned"))?;

        let now = Instant::now();
        // Expired entries are never read again unless polled; sweep them here.
        results.retain(|_, entry| entry.expires_at > now);

        if results.contains_key(key) {
            return Ok(false);
        }

        results.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );

        Ok(true)
    }
}
