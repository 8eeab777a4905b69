use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;

/// Time source for cache expiry. Swapped for a manual clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    payload: Value,
    fetched_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.fetched_at) >= self.ttl
    }
}

/// Time-bounded memoization of remote lookups, keyed by logical resource
/// name. An expired entry reads as absent and triggers a re-fetch; a failed
/// fetch writes nothing. Callers pick the TTL per resource class.
pub struct TtlCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Return the cached payload for `key` if still fresh, otherwise invoke
    /// `fetch` and store its result before returning it. Two concurrent
    /// misses on the same key may both fetch; the last successful write wins.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if let Some(payload) = self.get_fresh(key).await {
            return Ok(payload);
        }

        let payload = fetch().await?;

        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), CacheEntry {
            payload: payload.clone(),
            fetched_at: self.clock.now(),
            ttl,
        });

        Ok(payload)
    }

    async fn get_fresh(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.is_expired(self.clock.now()) {
            None
        } else {
            Some(entry.payload.clone())
        }
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}
