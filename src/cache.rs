//! Keyed response cache with a time-to-live, shared by every clone of a [`crate::Client`].
//!
//! Staleness is checked lazily on `get`; there is no background sweeper. Time comes from a
//! [`Clock`] so expiry can be driven by hand in tests.

use ahash::AHashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic milliseconds source.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock measured from construction.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: u64,
    payload: Value,
}

pub struct ResponseCache {
    clock: Arc<dyn Clock>,
    entries: Mutex<AHashMap<String, CacheEntry>>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock::new()))
    }
}

impl ResponseCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(AHashMap::new()),
        }
    }

    /// Payload stored under `key` if it is no older than `ttl`. A zero TTL never hits.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<Value> {
        if ttl.is_zero() {
            return None;
        }
        let now = self.clock.now_ms();
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        let age = now.saturating_sub(entry.stored_at);
        if age <= ttl.as_millis() as u64 {
            log::debug!("cache hit for {key} (age {age} ms)");
            Some(entry.payload.clone())
        } else {
            log::debug!("cache entry for {key} is stale (age {age} ms)");
            None
        }
    }

    pub fn set(&self, key: impl Into<String>, payload: Value) {
        let stored_at = self.clock.now_ms();
        self.entries
            .lock()
            .insert(key.into(), CacheEntry { stored_at, payload });
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Drop every entry whose key starts with `prefix`, or everything for `None`.
    /// Returns how many entries were removed.
    pub fn invalidate(&self, prefix: Option<&str>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        match prefix {
            None => entries.clear(),
            Some(p) => entries.retain(|k, _| !k.starts_with(p)),
        }
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
