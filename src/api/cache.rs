//! In-memory response cache with per-entry expiry.
//!
//! Entries carry an absolute expiry instant. There is no background sweeper:
//! a read that finds an expired entry evicts it and reports a miss, so stale
//! data is never handed out. Concurrent writers to the same key race and the
//! last write wins.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and replays. Time may move in either direction.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Thread-safe key/value cache with lazy TTL expiry.
pub struct ExpiringCache<V> {
    inner: Arc<RwLock<HashMap<String, Entry<V>>>>,
    clock: Arc<dyn Clock>,
}

impl<V> Clone for ExpiringCache<V> {
    fn clone(&self) -> Self {
        ExpiringCache {
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<V: Clone + Send + Sync> Default for ExpiringCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> ExpiringCache<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        ExpiringCache {
            inner: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Store `value` until `now + ttl`, replacing any previous entry.
    pub async fn set(&self, key: &str, value: V, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut inner = self.inner.write().await;
        inner.insert(key.to_string(), Entry { value, expires_at });
    }

    pub async fn set_minutes(&self, key: &str, value: V, ttl_minutes: u64) {
        self.set(key, value, Duration::from_secs(ttl_minutes.saturating_mul(60))).await;
    }

    /// The cached value, or `None` if absent or expired. An expired entry is
    /// removed before returning.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        {
            let inner = self.inner.read().await;
            match inner.get(key) {
                None => return None,
                Some(entry) if now <= entry.expires_at => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut inner = self.inner.write().await;
        // Another writer may have refreshed the entry between the two locks.
        if let Some(entry) = inner.get(key) {
            if now <= entry.expires_at {
                return Some(entry.value.clone());
            }
            inner.remove(key);
            debug!("Cache entry expired: {}", key);
        }
        None
    }

    /// Remove one entry, or everything when `key` is `None`.
    pub async fn clear(&self, key: Option<&str>) {
        let mut inner = self.inner.write().await;
        match key {
            Some(k) => {
                inner.remove(k);
            }
            None => inner.clear(),
        }
    }

    /// Number of stored entries, expired ones included until they are read.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
